// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! # Modules
//!
//! - [`camera`]: device traits, the lifecycle controller and the V4L2 backend

pub mod camera;
