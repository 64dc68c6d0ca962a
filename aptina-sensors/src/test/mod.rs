
pub(crate) use i2c_mock::{Event, MockDelay, MockError, MockPlatform, MockSensorBus};
