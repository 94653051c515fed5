mod browse;
mod campus;
mod helpers;
mod sync;

pub(crate) use browse::{cmd_categories, cmd_favorites, cmd_list, cmd_random, cmd_show, cmd_toggle};
pub(crate) use campus::cmd_campus;
pub(crate) use helpers::reload_logger;
pub(crate) use sync::{cmd_refresh, cmd_sync};
