//! Windows Credential Manager backend.
//!
//! Runs a PowerShell script that calls `CredWriteW`, `CredReadW` and
//! `CredDeleteW` on generic credentials named by [`Identity::target`]. The
//! script travels as `-EncodedCommand` and its inputs (mode, target, value)
//! arrive on stdin as base64 lines, so no argument quoting is involved and
//! the secret never appears on a command line.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;
use zeroize::Zeroizing;

use super::Backend;
use crate::core::constants::POWERSHELL_TOOL;
use crate::core::domain::Identity;
use crate::core::encoding;
use crate::core::process::{CommandOutput, CommandRunner, ToolCommand};
use crate::error::{BackendError, Error, Result};

/// Win32 text for `ERROR_NOT_FOUND`, printed when the exit code is lost.
const NOT_FOUND_SIGNALS: &[&str] = &["element not found"];

/// Exit code the script uses for `ERROR_NOT_FOUND` (1168).
const EXIT_NOT_FOUND: i32 = 2;

const SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
$lines = [Console]::In.ReadToEnd() -split "`r?`n"
$mode = $lines[0].Trim()
$target = [Text.Encoding]::UTF8.GetString([Convert]::FromBase64String($lines[1].Trim()))
Add-Type -TypeDefinition @'
using System;
using System.Runtime.InteropServices;
using System.Text;
public static class VaultCredential {
    [StructLayout(LayoutKind.Sequential, CharSet = CharSet.Unicode)]
    private struct CREDENTIAL {
        public int Flags;
        public int Type;
        public string TargetName;
        public string Comment;
        public System.Runtime.InteropServices.ComTypes.FILETIME LastWritten;
        public int CredentialBlobSize;
        public IntPtr CredentialBlob;
        public int Persist;
        public int AttributeCount;
        public IntPtr Attributes;
        public string TargetAlias;
        public string UserName;
    }
    [DllImport("advapi32.dll", CharSet = CharSet.Unicode, SetLastError = true)]
    private static extern bool CredWriteW(ref CREDENTIAL credential, int flags);
    [DllImport("advapi32.dll", CharSet = CharSet.Unicode, SetLastError = true)]
    private static extern bool CredReadW(string target, int type, int flags, out IntPtr credential);
    [DllImport("advapi32.dll", CharSet = CharSet.Unicode, SetLastError = true)]
    private static extern bool CredDeleteW(string target, int type, int flags);
    [DllImport("advapi32.dll")]
    private static extern void CredFree(IntPtr buffer);
    public static int Write(string target, string secret) {
        byte[] blob = Encoding.Unicode.GetBytes(secret);
        CREDENTIAL cred = new CREDENTIAL();
        cred.Type = 1;
        cred.TargetName = target;
        cred.UserName = target;
        cred.Persist = 2;
        cred.CredentialBlobSize = blob.Length;
        cred.CredentialBlob = Marshal.AllocHGlobal(blob.Length);
        try {
            Marshal.Copy(blob, 0, cred.CredentialBlob, blob.Length);
            return CredWriteW(ref cred, 0) ? 0 : Marshal.GetLastWin32Error();
        } finally {
            Marshal.FreeHGlobal(cred.CredentialBlob);
        }
    }
    public static string Read(string target, out int error) {
        IntPtr ptr;
        if (!CredReadW(target, 1, 0, out ptr)) {
            error = Marshal.GetLastWin32Error();
            return null;
        }
        try {
            CREDENTIAL cred = (CREDENTIAL)Marshal.PtrToStructure(ptr, typeof(CREDENTIAL));
            byte[] blob = new byte[cred.CredentialBlobSize];
            Marshal.Copy(cred.CredentialBlob, blob, 0, cred.CredentialBlobSize);
            error = 0;
            return Encoding.Unicode.GetString(blob);
        } finally {
            CredFree(ptr);
        }
    }
    public static int Delete(string target) {
        return CredDeleteW(target, 1, 0) ? 0 : Marshal.GetLastWin32Error();
    }
}
'@
switch ($mode) {
    'set' { $code = [VaultCredential]::Write($target, $lines[2].Trim()) }
    'get' {
        $code = 0
        $secret = [VaultCredential]::Read($target, [ref]$code)
        if ($code -eq 0) { [Console]::Out.Write($secret); exit 0 }
    }
    'delete' { $code = [VaultCredential]::Delete($target) }
    default { [Console]::Error.WriteLine("unknown mode $mode"); exit 64 }
}
if ($code -eq 0) { exit 0 }
if ($code -eq 1168) { [Console]::Error.WriteLine('Element not found.'); exit 2 }
[Console]::Error.WriteLine("Win32 error $code")
exit 1
"#;

/// Credential Manager backend using PowerShell
pub struct CredentialManager {
    runner: Arc<dyn CommandRunner>,
}

impl CredentialManager {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `SCRIPT` as UTF-16LE base64, the form `-EncodedCommand` expects.
    fn encoded_script() -> String {
        let utf16: Vec<u8> = SCRIPT
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        STANDARD.encode(utf16)
    }

    fn invoke(&self, mode: &str, id: &Identity<'_>, value: Option<&str>) -> Result<CommandOutput> {
        let mut input = Zeroizing::new(format!(
            "{}\n{}\n",
            mode,
            encoding::encode(id.target().as_bytes())
        ));
        if let Some(value) = value {
            input.push_str(value);
            input.push('\n');
        }

        let command = ToolCommand::new(POWERSHELL_TOOL)
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-EncodedCommand",
            ])
            .arg(Self::encoded_script())
            .stdin(input.as_bytes().to_vec());
        Ok(self.runner.run(&command)?)
    }

    fn is_absent(output: &CommandOutput) -> bool {
        output.status == Some(EXIT_NOT_FOUND) || output.stderr_contains_any(NOT_FOUND_SIGNALS)
    }
}

impl Backend for CredentialManager {
    fn name(&self) -> &'static str {
        "credential-manager"
    }

    fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()> {
        debug!(service = id.service(), key = id.key(), "storing secret in Credential Manager");
        let encoded = Zeroizing::new(encoding::encode(value));

        // CredWrite replaces an existing credential with the same target
        let output = self.invoke("set", id, Some(encoded.as_str()))?;
        if !output.success() {
            return Err(
                BackendError::command(POWERSHELL_TOOL, "set", output.status, &output.stderr)
                    .into(),
            );
        }
        Ok(())
    }

    fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>> {
        let output = self.invoke("get", id, None)?;
        if !output.success() {
            if Self::is_absent(&output) {
                return Err(Error::NotFound);
            }
            return Err(
                BackendError::command(POWERSHELL_TOOL, "get", output.status, &output.stderr)
                    .into(),
            );
        }

        let text = Zeroizing::new(String::from_utf8_lossy(&output.stdout).into_owned());
        if text.trim().is_empty() {
            return Err(Error::NotFound);
        }
        Ok(encoding::decode(&text).map_err(BackendError::from)?)
    }

    fn remove(&self, id: &Identity<'_>) -> Result<()> {
        let output = self.invoke("delete", id, None)?;
        if output.success() {
            debug!(service = id.service(), key = id.key(), "deleted secret from Credential Manager");
            return Ok(());
        }
        if Self::is_absent(&output) {
            return Err(Error::NotFound);
        }
        Err(BackendError::command(POWERSHELL_TOOL, "delete", output.status, &output.stderr).into())
    }
}
