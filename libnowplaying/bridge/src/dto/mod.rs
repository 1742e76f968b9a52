pub(crate) mod artwork;
pub(crate) mod bridge_error;
pub(crate) mod bridge_event;
pub(crate) mod command;
pub(crate) mod display_state;
pub(crate) mod fetch_error;
pub(crate) mod media_info;
pub(crate) mod transport_command;
