//! tgpipe-load - Raw Loader stage
//!
//! Discovers every acquired JSON batch file under the messages root and
//! bulk-loads their contents into `raw.telegram_messages`. Each run is a
//! full replace: the table is cleared and its identifier sequence reset
//! before loading, so the raw store always reflects exactly the most
//! recent load.

pub mod loader;

pub use loader::{LoadReport, RawLoader};
