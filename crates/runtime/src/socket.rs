// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime socket discovery.

use std::path::{Path, PathBuf};

use crate::error::RuntimeError;

/// Well-known socket locations, probed in order.
const WELL_KNOWN_SOCKETS: &[&str] = &[
    "/var/run/docker.sock",
    "/run/podman/podman.sock",
    "/var/run/podman/podman.sock",
];

/// Locate the runtime's UNIX socket.
///
/// Order: `CONTAINER_HOST` (stripping a `unix://` prefix), the well-known
/// system paths, then the rootless per-user path derived from the
/// effective UID. Fails with [`RuntimeError::SocketNotFound`] when none
/// exists.
pub fn discover_socket() -> Result<PathBuf, RuntimeError> {
    let env_host = std::env::var("CONTAINER_HOST").ok().filter(|s| !s.is_empty());
    resolve_socket(
        env_host.as_deref(),
        WELL_KNOWN_SOCKETS,
        &rootless_socket_path(),
    )
}

/// Rootless runtime socket for the current user.
fn rootless_socket_path() -> PathBuf {
    let uid = nix::unistd::geteuid().as_raw();
    PathBuf::from(format!("/run/user/{}/podman/podman.sock", uid))
}

fn resolve_socket(
    env_host: Option<&str>,
    well_known: &[&str],
    rootless: &Path,
) -> Result<PathBuf, RuntimeError> {
    // An explicit CONTAINER_HOST wins and is never fallen through: a typo
    // there should fail loudly, not silently pick another runtime.
    if let Some(host) = env_host {
        let path = PathBuf::from(host.strip_prefix("unix://").unwrap_or(host));
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "CONTAINER_HOST socket does not exist");
        return Err(RuntimeError::SocketNotFound);
    }

    for candidate in well_known {
        let path = Path::new(candidate);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    if rootless.exists() {
        return Ok(rootless.to_path_buf());
    }

    Err(RuntimeError::SocketNotFound)
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
