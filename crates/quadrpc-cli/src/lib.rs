// Copyright 2025 QuadRPC Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! # QuadRPC CLI
//!
//! Command-line interface for QuadRPC.
//!
//! This crate provides the main entry point for running QuadRPC components:
//!
//! - **Serve**: the demo calculator, greet and blog services over TCP
//! - **Call**: a single call of any pattern against a running server
//! - **Demo**: the reference scenarios, in-process
//!
//! ## Architecture
//!
//! The CLI uses the `argh` crate for argument parsing and dispatches to
//! `quadrpc-server` and `quadrpc-client`. The scenario runner lives in
//! [`demo`] so that it can be tested without spawning the binary.
//!
//! ## Key Commands
//!
//! - `quadrpc serve`: Start the demo services
//! - `quadrpc call`: Make a call (outputs raw JSON for scripting)
//! - `quadrpc demo`: Run the reference scenarios and report each

pub mod demo;
