pub(crate) mod dashboard;
pub(crate) mod discussions;
pub(crate) mod events;
pub(crate) mod meta;
pub(crate) mod notifications;
pub(crate) mod output;
pub(crate) mod requests;
pub(crate) mod solutions;
pub(crate) mod watch;
