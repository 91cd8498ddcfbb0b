// Application state for HTTP handlers
use crate::application::session::SessionHandle;

#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
}
