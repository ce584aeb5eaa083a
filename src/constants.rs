// Constants shared across the loader, repair stage, exporter and CLI.

/// Calendar date format used in the OrderDate and DeliveryDate columns
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default field delimiter for input and output
pub const DEFAULT_DELIMITER: u8 = b',';

/// Label written into ProductName when the cell is empty
pub const UNKNOWN_PRODUCT: &str = "Unknown";

/// Default number of rows returned by the top-N reports
pub const DEFAULT_TOP_N: usize = 5;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "order_cleaner.toml";

/// Directory for the rolling JSON log file
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Environment variable that overrides [`DEFAULT_LOG_DIR`]
pub const LOG_DIR_ENV: &str = "ORDER_CLEANER_LOG_DIR";
