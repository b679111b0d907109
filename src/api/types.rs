use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> ApiResponse<String> {
        ApiResponse {
            ok: true,
            data: Some("ok".to_string()),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> ApiResponse<String> {
        ApiResponse {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Deserialize)]
pub struct SetLevelRequest {
    pub level: String,
}

/// Drive the virtual input from outside the window. `press` is edge only
/// (interact, confirm, submit, erase); `hold` and `release` toggle held
/// actions such as movement and jump.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct InputRequest {
    pub press: Vec<String>,
    pub hold: Vec<String>,
    pub release: Vec<String>,
    pub text: Option<String>,
    /// Pointer in level coordinates.
    pub pointer: Option<[f32; 2]>,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NarrationState {
    pub playing: bool,
    pub pending: bool,
    pub source: Option<String>,
}

#[derive(Serialize)]
pub struct StopResult {
    pub stopped: bool,
}
