/*!
 * # subwatch - subtitle watch-and-translate service
 *
 * A Rust library that notices a new subtitle file during media playback and
 * translates it with an AI provider, keeping every cue's index and timing.
 *
 * ## Features
 *
 * - SRT parsing with line ending normalization and optional SDH cleaning
 * - Alignment-preserving batch translation: labeled lines, strict line-count
 *   validation and bounded retries
 * - Translation providers:
 *   - Gemini (default)
 *   - OpenAI and OpenAI-compatible servers (LM Studio)
 *   - Anthropic
 *   - Ollama (local LLM)
 * - Atomic or incremental output writing
 * - Playback-driven change watcher with cooperative cancellation
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Subtitle parsing and rendering
 * - `translation`: Alignment-preserving translation pipeline:
 *   - `translation::flatten`: One line per block
 *   - `translation::batch`: Batch planning
 *   - `translation::alignment`: Labeled-line protocol
 *   - `translation::recompose`: Rebuilding blocks from translated lines
 *   - `translation::core`: Pipeline driver
 * - `app_controller`: One translation run for one file
 * - `watcher`: Playback-driven change detection
 * - `status`: Progress and result reporting
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod status;
pub mod subtitle_processor;
pub mod translation;
pub mod watcher;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunOutcome};
pub use errors::{AppError, ProviderError, SubtitleError, TranslationError};
pub use language_utils::{get_language_name, normalize_to_part2t};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use translation::TranslationService;
pub use watcher::{ChangeWatcher, PollOutcome, WatcherPhase, WatcherState};
