//! Domain model (status, descriptors, registration requests).

pub mod app;
pub mod registration;
pub mod status;

pub use self::app::{
    ActivityFn, AppInfo, AppRecord, CustomProps, LoadFn, activity_fn, global_load_fn, load_fn,
    static_load_fn,
};
pub use self::registration::{AppArg, AppSource, Registration};
pub use self::status::AppStatus;
