pub mod device;
pub mod dispatcher;
pub mod resolver;

pub use device::{Device, DeviceCall, RecordingDevice};
pub use dispatcher::execute;
pub use resolver::{ClickTier, CLICK_TIERS};
