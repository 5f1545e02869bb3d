//! Cross-module integration tests driving the pipeline, drainer and store
//! together over scripted service doubles.
