//! Manifest compiler
//!
//! Turns a manifest into the bash script every node runs at boot. The script is
//! assembled against `$Bucket` and `$JobName` placeholders which are substituted
//! over the whole text at the end, so manifest commands may use them as well.
//!
//! Compilation is deterministic: the same manifest and bucket always produce
//! byte-identical output.

use crate::domain::checkpoint::{Checkpoint, CheckpointRegistry, Phase};
use crate::domain::layout::{JobKeys, NODE_LOG_FILES};
use crate::domain::manifest::Manifest;

const BUCKET_PLACEHOLDER: &str = "$Bucket";
const JOB_PLACEHOLDER: &str = "$JobName";
const INSTANCE_VAR: &str = "$InstanceId";

/// Scratch directory on the node
pub const WORK_DIR: &str = "/tmp/sortie";

const METADATA_URL: &str = "http://169.254.169.254/latest/meta-data";

/// A compiled startup script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    pub text: String,
    /// Every checkpoint emitted, in script order
    pub checkpoints: Vec<Checkpoint>,
}

/// Compiles a manifest for the given data bucket
pub fn compile(manifest: &Manifest, bucket: &str) -> CompiledScript {
    let mut script = ScriptBuilder::new();

    // Preamble
    script.line("#!/bin/bash");
    script.line("");
    script.line(format!(
        "InstanceId=$(curl -s {}/instance-id)",
        METADATA_URL
    ));
    script.line(format!("mkdir -p {}", WORK_DIR));
    script.line(format!("cd {}", WORK_DIR));
    script.line(format!("echo \"{0}\" > /tmp/{0}", INSTANCE_VAR));
    script.line("");

    // Download
    script.checkpoint("DownloadingFiles", Phase::Begin);
    for file in &manifest.files_to_download {
        script.line(format!(
            "aws s3 cp s3://{}/{} {}/{}",
            BUCKET_PLACEHOLDER,
            script.keys.resource(file),
            WORK_DIR,
            file
        ));
    }
    script.checkpoint("DownloadingFiles", Phase::End);

    // Install
    if let Some(commands) = &manifest.install_commands {
        script.line("echo \"Starting installation of dependencies at $(date)\"");
        script.checkpoint("InstallCommands", Phase::Begin);
        script.commands(commands);
        script.checkpoint("InstallCommands", Phase::End);
        script.line("echo \"Finished installation of dependencies at $(date)\"");
    }

    // Runs
    for iteration in 0..manifest.runs_per_node {
        let name = format!("CommandsToRun.{}", iteration);

        script.line(format!(
            "echo \"Starting execution #{} of commands at $(date)\"",
            iteration + 1
        ));
        script.checkpoint(&name, Phase::Begin);
        script.commands(&manifest.commands_to_run);
        script.checkpoint(&name, Phase::End);
        script.line(format!(
            "echo \"Finished execution #{} of commands at $(date)\"",
            iteration + 1
        ));

        for file in &manifest.files_to_upload {
            script.line(format!(
                "aws s3 cp {}/{} s3://{}/{}",
                WORK_DIR,
                file,
                BUCKET_PLACEHOLDER,
                script.keys.result(file, iteration, INSTANCE_VAR)
            ));
        }

        for logfile in NODE_LOG_FILES {
            script.line(format!(
                "aws s3 cp /var/log/{} s3://{}/{}",
                logfile,
                BUCKET_PLACEHOLDER,
                script.keys.log(INSTANCE_VAR, logfile)
            ));
        }
    }

    // Epilogue: ask the controller to terminate us, then terminate ourselves anyway
    script.line(format!(
        "AZ=$(curl -s {}/placement/availability-zone)",
        METADATA_URL
    ));
    script.line("REGION=${AZ::-1}");
    script.line(format!(
        "aws s3 cp /tmp/{} s3://{}/{}",
        INSTANCE_VAR,
        BUCKET_PLACEHOLDER,
        script.keys.terminate(INSTANCE_VAR)
    ));
    script.line(format!(
        "aws --region $REGION ec2 terminate-instances --instance-ids {}",
        INSTANCE_VAR
    ));

    script.finish(bucket, &manifest.job_name)
}

/// Quotes a command for the audit echo: JSON-escaped, then single-quoted
pub fn echo_command(command: &str) -> String {
    // Serializing a &str cannot fail
    let escaped = serde_json::to_string(command).unwrap_or_default();
    format!("echo Executing command '{}'", escaped.replace('\'', "'\\''"))
}

// =============================================================================
// Script Builder
// =============================================================================

struct ScriptBuilder {
    lines: Vec<String>,
    registry: CheckpointRegistry,
    checkpoints: Vec<Checkpoint>,
    keys: JobKeys,
}

impl ScriptBuilder {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            registry: CheckpointRegistry::new(),
            checkpoints: Vec::new(),
            keys: JobKeys::new(JOB_PLACEHOLDER),
        }
    }

    fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn commands(&mut self, commands: &[String]) {
        for command in commands {
            self.line(echo_command(command));
            self.line(command.clone());
        }
    }

    fn checkpoint(&mut self, name: &str, phase: Phase) {
        let checkpoint = self.registry.checkpoint(name, phase);
        self.line(format!(
            "date > /tmp/checkpoint && aws s3 cp /tmp/checkpoint s3://{}/{}",
            BUCKET_PLACEHOLDER,
            self.keys.checkpoint(INSTANCE_VAR, &checkpoint)
        ));
        self.checkpoints.push(checkpoint);
    }

    fn finish(self, bucket: &str, job_name: &str) -> CompiledScript {
        let mut text = self.lines.join("\n");
        text.push('\n');

        CompiledScript {
            text: text
                .replace(BUCKET_PLACEHOLDER, bucket)
                .replace(JOB_PLACEHOLDER, job_name),
            checkpoints: self.checkpoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_manifest() -> Manifest {
        Manifest {
            job_name: "t1".to_string(),
            files_to_download: vec!["a.sh".to_string()],
            install_commands: None,
            commands_to_run: vec!["./a.sh".to_string()],
            runs_per_node: 1,
            files_to_upload: vec!["out.dat".to_string()],
            number_of_batches: 2,
        }
    }

    #[test]
    fn test_compile_is_deterministic() {
        let mut manifest = scenario_manifest();
        manifest.install_commands = Some(vec!["apt-get install -y r-base".to_string()]);
        manifest.runs_per_node = 3;

        let first = compile(&manifest, "data-bucket");
        let second = compile(&manifest, "data-bucket");
        assert_eq!(first.text, second.text);
        assert_eq!(first.checkpoints, second.checkpoints);
    }

    #[test]
    fn test_scenario_script() {
        let script = compile(&scenario_manifest(), "data-bucket").text;
        let lines: Vec<&str> = script.lines().collect();

        assert_eq!(lines[0], "#!/bin/bash");
        assert_eq!(
            lines[2],
            "InstanceId=$(curl -s http://169.254.169.254/latest/meta-data/instance-id)"
        );
        assert!(lines.contains(&"mkdir -p /tmp/sortie"));
        assert!(lines.contains(
            &"aws s3 cp s3://data-bucket/jobs/t1/resources/a.sh /tmp/sortie/a.sh"
        ));
        assert!(lines.contains(
            &"aws s3 cp /tmp/sortie/out.dat s3://data-bucket/jobs/t1/results/out.dat.0.$InstanceId"
        ));
        assert!(lines.contains(
            &"aws s3 cp /var/log/syslog s3://data-bucket/jobs/t1/logs/$InstanceId.syslog"
        ));
        assert_eq!(
            lines[lines.len() - 2],
            "aws s3 cp /tmp/$InstanceId s3://data-bucket/jobs/t1/terminate/$InstanceId"
        );
        assert_eq!(
            lines[lines.len() - 1],
            "aws --region $REGION ec2 terminate-instances --instance-ids $InstanceId"
        );
        assert!(script.ends_with('\n'));
        assert!(!script.contains("$Bucket"));
        assert!(!script.contains("$JobName"));
    }

    #[test]
    fn test_download_bracketed_by_checkpoints() {
        let script = compile(&scenario_manifest(), "b").text;
        let lines: Vec<&str> = script.lines().collect();
        let download = lines
            .iter()
            .position(|l| l.contains("resources/a.sh"))
            .unwrap();

        assert!(lines[download - 1].ends_with("checkpoints/$InstanceId.0-DownloadingFiles-begin"));
        assert!(lines[download + 1].ends_with("checkpoints/$InstanceId.0-DownloadingFiles-end"));
    }

    #[test]
    fn test_install_section_omitted_when_absent() {
        let script = compile(&scenario_manifest(), "b");
        assert!(!script.text.contains("InstallCommands"));
        assert!(!script.text.contains("installation of dependencies"));
    }

    #[test]
    fn test_install_section_emitted_when_present() {
        let mut manifest = scenario_manifest();
        manifest.install_commands = Some(vec!["pip install numpy".to_string()]);

        let script = compile(&manifest, "b").text;
        let lines: Vec<&str> = script.lines().collect();
        let begin = lines
            .iter()
            .position(|l| l.ends_with("1-InstallCommands-begin"))
            .unwrap();

        assert_eq!(lines[begin + 1], "echo Executing command '\"pip install numpy\"'");
        assert_eq!(lines[begin + 2], "pip install numpy");
        assert!(lines[begin + 3].ends_with("1-InstallCommands-end"));
    }

    #[test]
    fn test_checkpoint_indices_first_use_order() {
        let mut manifest = scenario_manifest();
        manifest.install_commands = Some(vec![]);
        manifest.runs_per_node = 2;

        let script = compile(&manifest, "b");
        let indexed: Vec<(usize, &str, Phase)> = script
            .checkpoints
            .iter()
            .map(|c| (c.sequence_index, c.name.as_str(), c.phase))
            .collect();

        assert_eq!(
            indexed,
            vec![
                (0, "DownloadingFiles", Phase::Begin),
                (0, "DownloadingFiles", Phase::End),
                (1, "InstallCommands", Phase::Begin),
                (1, "InstallCommands", Phase::End),
                (2, "CommandsToRun.0", Phase::Begin),
                (2, "CommandsToRun.0", Phase::End),
                (3, "CommandsToRun.1", Phase::Begin),
                (3, "CommandsToRun.1", Phase::End),
            ]
        );
    }

    #[test]
    fn test_uploads_suffixed_per_iteration() {
        let mut manifest = scenario_manifest();
        manifest.runs_per_node = 3;
        manifest.files_to_upload = vec!["a.out".to_string(), "b.out".to_string()];

        let script = compile(&manifest, "b").text;
        for iteration in 0..3 {
            for file in ["a.out", "b.out"] {
                let key = format!("jobs/t1/results/{}.{}.$InstanceId", file, iteration);
                assert_eq!(script.matches(&key).count(), 1, "missing {}", key);
            }
        }
        assert_eq!(script.matches("Starting execution #").count(), 3);
        assert!(script.contains("Starting execution #3 of commands"));
    }

    #[test]
    fn test_placeholders_substituted_in_commands() {
        let mut manifest = scenario_manifest();
        manifest.commands_to_run = vec!["echo $JobName in $Bucket".to_string()];

        let script = compile(&manifest, "data").text;
        assert!(script.lines().any(|l| l == "echo t1 in data"));
    }

    #[test]
    fn test_echo_command_escaping() {
        assert_eq!(echo_command("ls"), "echo Executing command '\"ls\"'");
        assert_eq!(
            echo_command("echo \"it's\""),
            "echo Executing command '\"echo \\\"it'\\''s\\\"\"'"
        );
    }

    #[test]
    fn test_region_from_availability_zone() {
        let script = compile(&scenario_manifest(), "b").text;
        assert!(script.contains(
            "AZ=$(curl -s http://169.254.169.254/latest/meta-data/placement/availability-zone)\nREGION=${AZ::-1}\n"
        ));
    }
}
