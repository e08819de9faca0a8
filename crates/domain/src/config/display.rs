use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Print the numbered source list under each finished answer.
    #[serde(default = "d_true")]
    pub show_sources: bool,
    /// Use ANSI colors in terminal output.
    #[serde(default = "d_true")]
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_sources: true,
            color: true,
        }
    }
}

fn d_true() -> bool {
    true
}
