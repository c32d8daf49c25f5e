// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Access policy, placement and ordering properties of built graphs.

mod graph_properties;
