use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;

use log::{debug, info, warn};
use ssh2::Session;

use crate::config::Server;
use crate::errors::{Error, Result};
use crate::queue::{parse_job_status, ClusterSoft, JobStatus};

/// A blocking SSH connection to one cluster. Every command runs in its own
/// channel and blocks until the remote process exits; there is no interactive
/// state kept on the server between calls.
pub struct SshClient {
    /// name of the server block this client was built from
    pub server: String,
    soft: ClusterSoft,
    user: String,
    session: Session,
}

fn lines(s: String) -> Vec<String> {
    s.lines().map(str::to_string).collect()
}

impl SshClient {
    /// Open a session to `server` and authenticate with its key pair.
    /// Network and authentication failures are connection-kind errors.
    pub fn connect(name: &str, server: &Server) -> Result<Self> {
        let addr = if server.address.contains(':') {
            server.address.clone()
        } else {
            format!("{}:22", server.address)
        };
        let err = |e: &dyn ToString| Error::server(name, e.to_string());
        let tcp = TcpStream::connect(&addr).map_err(|e| err(&e))?;
        let mut session = Session::new().map_err(|e| err(&e))?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| err(&e))?;
        session
            .userauth_pubkey_file(
                &server.user,
                None,
                Path::new(&server.key),
                None,
            )
            .map_err(|e| err(&e))?;
        info!("connected to {name} as {}", server.user);
        Ok(Self {
            server: name.to_string(),
            soft: server.cluster_soft,
            user: server.user.clone(),
            session,
        })
    }

    fn err(&self, e: impl ToString) -> Error {
        Error::server(&self.server, e.to_string())
    }

    /// Run `cmd` on the server, blocking until it exits, and return the
    /// captured stdout and stderr as lines. A non-zero remote exit status is
    /// not an error; many cluster commands exit non-zero for benign reasons,
    /// so stderr is handed back for the caller to inspect.
    pub fn send_command(&self, cmd: &str) -> Result<(Vec<String>, Vec<String>)> {
        debug!("[{}] running '{cmd}'", self.server);
        let mut channel =
            self.session.channel_session().map_err(|e| self.err(e))?;
        channel.exec(cmd).map_err(|e| self.err(e))?;
        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|e| self.err(e))?;
        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|e| self.err(e))?;
        channel.wait_close().map_err(|e| self.err(e))?;
        Ok((lines(stdout), lines(stderr)))
    }

    /// Take a fresh queue snapshot and classify `job_id` against it.
    pub fn check_job_status(&self, job_id: u64) -> Result<JobStatus> {
        let cmd = self.soft.status_command(&self.user);
        let (stdout, stderr) = self.send_command(&cmd)?;
        if !stderr.is_empty() {
            warn!(
                "[{}] '{cmd}' wrote to stderr: {}",
                self.server,
                stderr.join(" | ")
            );
        }
        Ok(parse_job_status(self.soft, job_id, &stdout.join("\n")))
    }

    /// Issue the scheduler's cancel command for one job.
    pub fn delete_job(&self, job_id: u64) -> Result<()> {
        let cmd = self.soft.delete_command(job_id);
        let (_, stderr) = self.send_command(&cmd)?;
        if !stderr.is_empty() {
            warn!(
                "[{}] '{cmd}' wrote to stderr: {}",
                self.server,
                stderr.join(" | ")
            );
        }
        info!("[{}] deleted job {job_id}", self.server);
        Ok(())
    }

    /// Cancel every job whose name starts with `prefix` and return how many
    /// were deleted. Useful after terminating a run that left ghost jobs
    /// behind. Make sure the prefix is qcflow's own so unrelated jobs
    /// survive.
    pub fn delete_all_jobs(&self, prefix: &str) -> Result<usize> {
        info!("deleting all jobs with prefix '{prefix}' from {}", self.server);
        let cmd = self.soft.status_command(&self.user);
        let (stdout, _) = self.send_command(&cmd)?;
        let mut deleted = 0;
        for line in &stdout {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (Some(id), Some(name)) =
                (fields.first(), fields.get(self.soft.name_field()))
            else {
                continue;
            };
            let Ok(id) = id.parse::<u64>() else { continue };
            if name.starts_with(prefix) {
                self.delete_job(id)?;
                deleted += 1;
            }
        }
        info!("[{}] deleted {deleted} jobs", self.server);
        Ok(deleted)
    }

    /// Upload a local file over SFTP.
    pub fn upload_file(&self, local: &Path, remote: &str) -> Result<()> {
        let data = std::fs::read(local)?;
        self.upload_bytes(&data, remote)
    }

    /// Write `data` to a remote file over SFTP.
    pub fn upload_bytes(&self, data: &[u8], remote: &str) -> Result<()> {
        let sftp = self.session.sftp().map_err(|e| self.err(e))?;
        let mut f = sftp.create(Path::new(remote)).map_err(|e| self.err(e))?;
        f.write_all(data).map_err(|e| self.err(e))?;
        debug!("[{}] uploaded {remote}", self.server);
        Ok(())
    }

    /// Download a remote file over SFTP.
    pub fn download_file(&self, remote: &str, local: &Path) -> Result<()> {
        let sftp = self.session.sftp().map_err(|e| self.err(e))?;
        let mut f = sftp.open(Path::new(remote)).map_err(|e| self.err(e))?;
        let mut data = Vec::new();
        f.read_to_end(&mut data).map_err(|e| self.err(e))?;
        std::fs::write(local, data)?;
        debug!("[{}] downloaded {remote}", self.server);
        Ok(())
    }

    /// Submit the script at `script` inside `remote_dir` and return the
    /// scheduler's job id, parsed out of the submit command's output.
    pub fn submit_job(&self, remote_dir: &str, script: &str) -> Result<u64> {
        let cmd = format!(
            "cd {remote_dir} && {} {script}",
            self.soft.submit_command()
        );
        let (stdout, stderr) = self.send_command(&cmd)?;
        parse_submit_output(&stdout).ok_or_else(|| {
            self.err(format!(
                "no job id in submit output; stdout: {stdout:?}, stderr: \
                 {stderr:?}"
            ))
        })
    }
}

/// Pull the job id out of submit-command output like
/// `Your job 582682 ("a_propene_opt") has been submitted` (qsub) or
/// `Submitted batch job 588334` (sbatch): the first whitespace-delimited
/// field that parses as an integer.
pub fn parse_submit_output(stdout: &[String]) -> Option<u64> {
    stdout
        .iter()
        .flat_map(|line| line.split_whitespace())
        .find_map(|word| word.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string;

    #[test]
    fn test_parse_qsub_output() {
        let stdout =
            string![r#"Your job 582682 ("a_propene_opt") has been submitted"#];
        assert_eq!(parse_submit_output(&stdout), Some(582682));
    }

    #[test]
    fn test_parse_sbatch_output() {
        let stdout = string!["Submitted batch job 588334"];
        assert_eq!(parse_submit_output(&stdout), Some(588334));
    }

    #[test]
    fn test_no_job_id() {
        let stdout = string!["qsub: submit error"];
        assert_eq!(parse_submit_output(&stdout), None);
        assert_eq!(parse_submit_output(&[]), None);
    }
}
