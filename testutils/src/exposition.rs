// Prometheus text-format bodies used by the parser, processor, and scraper
// tests.

pub const SIMPLE_GAUGE_BODY: &str = "# HELP x foo\n# TYPE x gauge\nx{a=\"1\",b=\"2\"} 3.14\n";

pub const ESCAPED_LABELS_BODY: &str =
    "weird{path=\"C:\\\\temp\",msg=\"say \\\"hi\\\"\",multi=\"a\\nb\"} 1\n";

pub const NON_FINITE_BODY: &str = "\
# TYPE gauge_metric gauge
gauge_metric{case=\"pos\"} +Inf
gauge_metric{case=\"neg\"} -Inf
gauge_metric{case=\"nan\"} NaN
gauge_metric{case=\"ok\"} 42
";

pub const HISTOGRAM_BODY: &str = "\
# HELP http_request_duration_seconds request latency
# TYPE http_request_duration_seconds histogram
http_request_duration_seconds_bucket{le=\"0.1\"} 240
http_request_duration_seconds_bucket{le=\"+Inf\"} 1443
http_request_duration_seconds_sum 534.23
http_request_duration_seconds_count 1443
";
