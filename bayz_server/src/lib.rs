// bayz_server: commit/fetch channel and live-coding front end for bayz.
//
// A live session stages generated lines on a `Band` and commits them; a
// browser playback client polls the HTTP server and plays whatever was
// committed last. Each commit is delivered to exactly one fetch.
//
// Module overview:
// - `channel.rs`:  `PendingSlot`, the single pending payload with
//                  take-on-read semantics.
// - `server.rs`:   `tiny_http` listener on a background thread, CORS and
//                  JSON headers, `start_server` / `ServerHandle`.
// - `band.rs`:     `Band` (lines + cycle length) and the `CommitSink` it
//                  commits through.
// - `config.rs`:   `LiveConfig` for the live binary.
//
// The `bayz-live` binary (`main.rs`) wires a generation cache from
// `bayz_model` to a band and the server, driven by stdin commands.

pub mod band;
pub mod channel;
pub mod config;
pub mod server;

pub use server::start_server;
