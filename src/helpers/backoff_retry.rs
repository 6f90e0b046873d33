use std::fmt::Display;
use std::time::Duration;

use backoff::{retry_notify, Error, ExponentialBackoff};

pub fn backoff_retry<F, T, E>(fn_to_try: F, max_elapsed: Option<Duration>) -> Result<T, Error<E>>
where
    F: FnMut() -> Result<T, Error<E>>,
    E: Display,
{
    let notify = |err, dur: Duration| {
        log::error!(
            "Temporary error after {:.1}s: {}",
            dur.as_secs_f32(),
            err
        );
    };

    let backoff = ExponentialBackoff {
        max_elapsed_time: max_elapsed,
        ..ExponentialBackoff::default()
    };
    retry_notify(backoff, fn_to_try, notify)
}

/// Unwraps the underlying error regardless of whether it was retried.
pub fn into_inner<E>(err: Error<E>) -> E {
    match err {
        Error::Permanent(e) => e,
        Error::Transient { err, .. } => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retried_until_success() {
        let mut attempts = 0;
        let res: Result<u8, Error<String>> = backoff_retry(
            || {
                attempts += 1;
                if attempts < 3 {
                    Err(Error::transient("not yet".to_string()))
                } else {
                    Ok(7)
                }
            },
            Some(Duration::from_secs(30)),
        );
        assert_eq!(res.unwrap(), 7);
        assert_eq!(attempts, 3);
    }

    #[test]
    fn permanent_error_is_not_retried() {
        let mut attempts = 0;
        let res: Result<(), Error<String>> = backoff_retry(
            || {
                attempts += 1;
                Err(Error::permanent("broken".to_string()))
            },
            None,
        );
        assert_eq!(into_inner(res.unwrap_err()), "broken");
        assert_eq!(attempts, 1);
    }
}
