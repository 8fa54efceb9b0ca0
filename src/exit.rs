use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    InvalidArgs,
    UnsupportedPlatform,
    Internal,
    CleanupFailed,
    Interrupted,
}

impl ExitCode {
    pub const fn as_i32(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::InvalidArgs => 2,
            ExitCode::UnsupportedPlatform => 3,
            ExitCode::Internal => 10,
            ExitCode::CleanupFailed => 20,
            ExitCode::Interrupted => 130,
        }
    }
}

#[derive(Debug)]
pub struct ExitError {
    pub code: ExitCode,
    pub err: anyhow::Error,
}

impl ExitError {
    pub fn new(code: ExitCode, err: anyhow::Error) -> Self {
        Self { code, err }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl std::error::Error for ExitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.err.as_ref())
    }
}

pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(exit) = err.downcast_ref::<ExitError>() {
        return exit.code.as_i32();
    }
    ExitCode::Internal.as_i32()
}

pub fn invalid_args(message: impl Into<String>) -> anyhow::Error {
    ExitError::new(ExitCode::InvalidArgs, anyhow::anyhow!(message.into())).into()
}

pub fn invalid_args_err(err: anyhow::Error) -> anyhow::Error {
    ExitError::new(ExitCode::InvalidArgs, err).into()
}

pub fn unsupported_platform(os: &str) -> anyhow::Error {
    ExitError::new(
        ExitCode::UnsupportedPlatform,
        anyhow::anyhow!("no cleaners available for this operating system: {os}"),
    )
    .into()
}

pub fn cleanup_failed(failed: usize, total: usize) -> anyhow::Error {
    ExitError::new(
        ExitCode::CleanupFailed,
        anyhow::anyhow!("{failed} of {total} cleanup actions failed"),
    )
    .into()
}

pub fn interrupted(skipped: usize) -> anyhow::Error {
    ExitError::new(
        ExitCode::Interrupted,
        anyhow::anyhow!("run interrupted; {skipped} cleanup actions were not started"),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn exit_code_survives_added_context() {
        let err = invalid_args("bad flag");
        assert_eq!(exit_code(&err), 2);

        let wrapped: anyhow::Result<()> = Err(cleanup_failed(1, 3));
        let wrapped = wrapped.context("batch run").unwrap_err();
        assert_eq!(exit_code(&wrapped), 20);
    }

    #[test]
    fn plain_errors_are_internal() {
        assert_eq!(exit_code(&anyhow::anyhow!("oops")), 10);
        assert_eq!(exit_code(&unsupported_platform("plan9")), 3);
        assert_eq!(exit_code(&interrupted(2)), 130);
    }
}
