/*!
`dflog` parses ArduPilot DataFlash telemetry logs (binary or text), merges
a second log's tables into a primary log while reconciling independently
assigned type-IDs and timestamps, and re-serializes the result to the
canonical sorted text form.

# Example

```no_run
use dflog::binary::parse_binary_log;
use dflog::serializer;
use std::fs::File;

let file = File::open("flight.bin").unwrap();
let mut log = parse_binary_log(file).unwrap();

let donor_file = File::open("gimbal.bin").unwrap();
let donor = parse_binary_log(donor_file).unwrap();
dflog::merger::merge(&mut log, donor, &[], 0.0, false);

serializer::write_to_file(&log, std::path::Path::new("merged.log")).unwrap();
```
*/
pub mod aligner;
pub mod binary;
pub mod error;
pub mod format;
pub mod framer;
pub mod gps;
pub mod idpool;
pub mod merger;
pub mod serializer;
pub mod table;
pub mod text;
pub mod value;

pub use error::DflogError;
pub use table::{Log, Row, Table};
