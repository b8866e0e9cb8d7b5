/*!
Replay scripts for requests sent to a collector.

A replay script is a shell script that re-sends a request with `curl`, so a failing export can be
reproduced and inspected outside of the agent.
*/

use std::{
    fmt::Write as _,
    fs, io,
    path::{Path, PathBuf},
};

use crate::{client::HttpRequest, data::Encoding};

const SCRIPT_FILE: &str = "last-request.sh";
const BODY_FILE: &str = "last-request.bin";

/**
Write a replay script for `request` into `dir`, returning the path of the script.

JSON bodies are inlined into the script. Binary bodies are written alongside it.
*/
pub(crate) fn write(dir: &Path, request: &HttpRequest, encoding: Encoding) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let script = match encoding {
        Encoding::Json => script(request, Body::Inline(&String::from_utf8_lossy(&request.body))),
        Encoding::Proto => {
            let body_path = dir.join(BODY_FILE);
            fs::write(&body_path, &request.body)?;

            script(request, Body::File(&body_path))
        }
    };

    let script_path = dir.join(SCRIPT_FILE);
    fs::write(&script_path, script)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;

        fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(script_path)
}

enum Body<'a> {
    Inline(&'a str),
    File(&'a Path),
}

fn script(request: &HttpRequest, body: Body) -> String {
    let mut script = String::from("#!/bin/sh\n");

    let _ = writeln!(script, "curl -X POST {} \\", quote(&request.uri));

    for (name, value) in &request.headers {
        let _ = writeln!(script, "  -H {} \\", quote(&format!("{name}: {value}")));
    }

    match body {
        Body::Inline(body) => {
            let _ = writeln!(script, "  --data-raw {}", quote(body));
        }
        Body::File(path) => {
            let _ = writeln!(
                script,
                "  --data-binary @{}",
                quote(&path.display().to_string())
            );
        }
    }

    script
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
