// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runnable demonstrations of the Formwire crates. See the `examples/` directory.
