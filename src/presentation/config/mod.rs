mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    AudioSettings, AuthSettings, DatabaseSettings, ServerSettings, Settings, WorkerSettings,
};
