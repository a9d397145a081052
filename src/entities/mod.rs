pub mod open_platform;
pub mod tester;

pub use open_platform::Entity as OpenPlatform;
pub use tester::Entity as Tester;
