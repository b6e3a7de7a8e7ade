pub const TEST_NAMESPACE: &str = "test-namespace";
pub const TEST_TARGET_NAME: &str = "test-target";
pub const TEST_POD: &str = "the-pod";
pub const TEST_SERVICE: &str = "the-service";
pub const TEST_NODE: &str = "node-1";
pub const TEST_POD_IP: &str = "10.1.2.3";
pub const TEST_NOT_READY_IP: &str = "10.1.2.4";
pub const TEST_PORT: i32 = 9100;
pub const TEST_PORT_NAME: &str = "metrics";
pub const TEST_APP_LABEL: (&str, &str) = ("app", "nginx");
