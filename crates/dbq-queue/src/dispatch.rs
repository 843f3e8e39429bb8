// SPDX-FileCopyrightText: 2026 dbq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guarded launch and completion mapping shared by every processor.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use dbq_core::{CommandError, CommandKind, CommandResult, LaunchResult, OperationFuture};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Calls a launch primitive, converting launch errors and panics into the
/// command's terminal error.
///
/// A token that is already cancelled skips the launch entirely.
pub(crate) fn launch_guarded<T, E: Display>(
    executor: &str,
    kind: CommandKind,
    cancel: &CancellationToken,
    start: impl FnOnce() -> LaunchResult<T, E>,
) -> Result<OperationFuture<T, E>, CommandError<E>> {
    if cancel.is_cancelled() {
        return Err(CommandError::Cancelled);
    }
    match panic::catch_unwind(AssertUnwindSafe(start)) {
        Ok(Ok(operation)) => Ok(operation),
        Ok(Err(err)) => {
            warn!(executor, %kind, error = %err, "command launch failed");
            Err(err.into())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(executor, %kind, panic = %message, "command launch panicked");
            Err(CommandError::Panicked(message))
        }
    }
}

/// Drives a launched operation to its terminal result.
///
/// `map` turns the operation's output into the value handed to the caller.
pub(crate) async fn run_guarded<T, R, E>(
    operation: OperationFuture<T, E>,
    map: fn(T) -> R,
) -> CommandResult<R, E> {
    match AssertUnwindSafe(operation).catch_unwind().await {
        Ok(Ok(value)) => Ok(map(value)),
        Ok(Err(err)) => Err(err.into()),
        Err(payload) => Err(CommandError::Panicked(panic_message(payload.as_ref()))),
    }
}

/// Scalar fetches that produce no row value resolve with the default.
pub(crate) fn scalar_or_default<S: Default>(value: Option<S>) -> S {
    value.unwrap_or_default()
}

/// Label used for completion metrics.
pub(crate) fn outcome<T, E>(result: &CommandResult<T, E>) -> &'static str {
    match result {
        Ok(_) => "value",
        Err(CommandError::Cancelled) => "cancelled",
        Err(_) => "failed",
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use dbq_core::{LaunchError, OperationError};

    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("locked")]
    struct Locked;

    #[test]
    fn pre_cancelled_token_skips_launch() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut launched = false;
        let result = launch_guarded::<u64, Locked>("test", CommandKind::NonQuery, &cancel, || {
            launched = true;
            Ok(async { Ok(1) }.boxed())
        });
        assert!(matches!(result, Err(CommandError::Cancelled)));
        assert!(!launched);
    }

    #[test]
    fn launch_error_becomes_driver_error() {
        let result = launch_guarded::<u64, Locked>(
            "test",
            CommandKind::NonQuery,
            &CancellationToken::new(),
            || Err(LaunchError::Failed(Locked)),
        );
        assert!(matches!(result, Err(CommandError::Driver(Locked))));
    }

    #[test]
    fn launch_panic_becomes_panicked_error() {
        let result = launch_guarded::<u64, Locked>(
            "test",
            CommandKind::Scalar,
            &CancellationToken::new(),
            || panic!("driver exploded"),
        );
        match result {
            Err(CommandError::Panicked(message)) => assert_eq!(message, "driver exploded"),
            _ => panic!("expected a panicked launch"),
        }
    }

    #[tokio::test]
    async fn run_guarded_maps_every_outcome() {
        let value = run_guarded::<Option<i64>, i64, Locked>(
            async { Ok(None) }.boxed(),
            scalar_or_default,
        )
        .await;
        assert_eq!(value.unwrap(), 0);

        let cancelled =
            run_guarded::<u64, u64, Locked>(async { Err(OperationError::Cancelled) }.boxed(), |v| v)
                .await;
        assert_eq!(outcome(&cancelled), "cancelled");

        let failed = run_guarded::<u64, u64, Locked>(
            async { Err(OperationError::Failed(Locked)) }.boxed(),
            |v| v,
        )
        .await;
        assert_eq!(failed.unwrap_err().into_driver(), Some(Locked));

        let panicked = run_guarded::<u64, u64, Locked>(
            async {
                if true {
                    panic!("{}", String::from("mid-flight"));
                }
                Ok(0)
            }
            .boxed(),
            |v| v,
        )
        .await;
        assert!(matches!(panicked, Err(CommandError::Panicked(m)) if m == "mid-flight"));
    }
}
