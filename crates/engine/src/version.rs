// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

/// Package version, with a `-dev.N` suffix when `SQLSCRIPT_DEV_BUILD=N` was
/// set at compile time
pub fn get_version_text() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("SQLSCRIPT_DEV_BUILD") {
        Some(build) if !build.is_empty() => format!("{version}-dev.{build}"),
        _ => version.to_string(),
    }
}
