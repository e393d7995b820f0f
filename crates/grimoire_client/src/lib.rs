//! Push helper for producers that send figures to a GrimoirePlot server.
//!
//! Both blocking and async variants POST to `{server}/add_plot` with the
//! `grimoire-secret` header and fail on any non-success status.

mod error;
mod figure;
mod push;

pub use error::{ClientError, ClientResult};
pub use figure::Figure;
pub use push::{
    push_plot, push_plot_blocking, push_plot_json, push_plot_json_blocking, PushTarget,
};
