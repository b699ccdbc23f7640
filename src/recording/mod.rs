//! Persisted snapshot streams and their playback.
//!
//! A recording is a JSON Lines file: a header line followed by one snapshot
//! per line in tick order. Blobs are not stored; they are recomputed from the
//! node readings when the file is loaded.

pub mod player;
pub mod stream;

pub use player::Player;
pub use stream::{read_recording, Recording, RecordingHeader, RecordingWriter, FORMAT_NAME, FORMAT_VERSION};
