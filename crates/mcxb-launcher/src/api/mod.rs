mod context;
mod dashboard;
mod handlers;
mod responses;
mod server;

pub use context::ApiContext;
pub use dashboard::{html_escape, list_work_dir, render_dashboard, DashboardView};
pub use handlers::handle_request;
pub use responses::*;
pub use server::ApiServer;
