/*!
Run a system command and capture what it prints.
*/

use std::{process::Stdio, time::Duration};

use tokio::process::Command;

use crate::Error;

const TIMEOUT: Duration = Duration::from_secs(10);

/**
Run `program` with `args` and return its standard output.

The command fails if it can't be spawned, exits unsuccessfully, or runs for longer than 10
seconds. A command that times out is killed.
*/
pub(crate) async fn run(program: &str, args: &[&str]) -> Result<String, Error> {
    let mut command = Command::new(program);

    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::time::timeout(TIMEOUT, command.output())
        .await
        .map_err(|_| Error::msg(format_args!("{program} timed out after {TIMEOUT:?}")))?
        .map_err(|e| Error::new(format_args!("failed to run {program}"), e))?;

    if !output.status.success() {
        return Err(Error::msg(format_args!(
            "{program} command failed with {}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_captures_stdout() {
        assert_eq!("hello\n", run("echo", &["hello"]).await.unwrap());
    }

    #[tokio::test]
    async fn run_fails_on_unsuccessful_exit() {
        let err = run("false", &[]).await.unwrap_err();

        assert!(err.to_string().starts_with("false command failed"));
    }

    #[tokio::test]
    async fn run_fails_on_missing_program() {
        let err = run("metrix-no-such-program", &[]).await.unwrap_err();

        assert!(err
            .to_string()
            .starts_with("failed to run metrix-no-such-program: "));
    }
}
