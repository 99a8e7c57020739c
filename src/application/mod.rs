//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers own no state besides their injected ports and configuration.

pub mod handlers;

pub use handlers::billing::{
    AddAddonCommand, AddAddonHandler, AddonPrices, CheckoutUrls, CreateCheckoutCommand,
    CreateCheckoutHandler, GetSubscriptionHandler, GetSubscriptionQuery,
    ProcessWebhookCommand, ProcessWebhookHandler, RemoveAddonCommand, RemoveAddonHandler,
    SubscriptionView, WebhookOutcome,
};
pub use handlers::team::{
    AcceptInvitationCommand, AcceptInvitationHandler, CancelInvitationCommand,
    CancelInvitationHandler, CreateInvitationCommand, CreateInvitationHandler, CreateTeamCommand,
    CreateTeamHandler, DeclineInvitationCommand, DeclineInvitationHandler,
    GetInvitationDetailsHandler, GetInvitationDetailsQuery, InvitationDetails, ListInvitationsHandler,
    ListInvitationsQuery, RemoveMemberCommand, RemoveMemberHandler, UpdateMemberRoleCommand,
    UpdateMemberRoleHandler,
};
