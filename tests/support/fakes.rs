//! Stand-ins for the platform vault tools.
//!
//! `FakeTools` answers `security`, `secret-tool` and `powershell`
//! invocations the way the real tools do, backed by one in-memory map per
//! tool. It checks the argument shapes the backends send, so a change in
//! how a backend calls its tool shows up here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use platform_vault::{BackendError, CommandOutput, CommandRunner, ToolCommand, ToolProbe};

/// Exact stderr `security` prints for a missing item.
pub const SECURITY_MISSING: &str =
    "security: SecKeychainSearchCopyNext: The specified item could not be found in the keychain.\n";

type Items = HashMap<(&'static str, String, String), String>;

/// Emulated vault tools sharing no state with the host.
#[derive(Default)]
pub struct FakeTools {
    items: Mutex<Items>,
    calls: AtomicUsize,
    broken: AtomicBool,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation fail as if the vault daemon were down.
    pub fn break_all(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// Number of tool invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stored text for an item, as the tool would hold it.
    pub fn raw(&self, tool: &'static str, service: &str, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap()
            .get(&(tool, service.to_string(), key.to_string()))
            .cloned()
    }

    /// Plant an item directly, bypassing the backend.
    pub fn plant(&self, tool: &'static str, service: &str, key: &str, text: &str) {
        self.items
            .lock()
            .unwrap()
            .insert((tool, service.to_string(), key.to_string()), text.to_string());
    }

    fn security(&self, args: &[String]) -> CommandOutput {
        let account = flag(args, "-a");
        let service = flag(args, "-s");
        let slot = ("security", service.clone(), account.clone());
        let mut items = self.items.lock().unwrap();
        match args[0].as_str() {
            "add-generic-password" => {
                assert!(args.contains(&"-U".to_string()), "add must update in place");
                items.insert(slot, flag(args, "-w"));
                CommandOutput::new(0, "", "")
            }
            "find-generic-password" => match items.get(&slot) {
                Some(text) => CommandOutput::new(0, format!("{}\n", text), ""),
                None => CommandOutput::new(44, "", SECURITY_MISSING),
            },
            "delete-generic-password" => match items.remove(&slot) {
                Some(_) => CommandOutput::new(0, "keychain: \"login.keychain-db\"\n", ""),
                None => CommandOutput::new(44, "", SECURITY_MISSING),
            },
            other => panic!("unexpected security subcommand {}", other),
        }
    }

    fn secret_tool(&self, args: &[String], stdin: Option<&[u8]>) -> CommandOutput {
        let service = attribute(args, "service");
        let key = attribute(args, "key");
        let slot = ("secret-tool", service, key);
        let mut items = self.items.lock().unwrap();
        match args[0].as_str() {
            "store" => {
                let input = stdin.expect("store reads the secret from stdin");
                items.insert(slot, String::from_utf8(input.to_vec()).unwrap());
                CommandOutput::new(0, "", "")
            }
            // lookup prints without a trailing newline and exits 1 on a miss
            "lookup" => match items.get(&slot) {
                Some(text) => CommandOutput::new(0, text.clone(), ""),
                None => CommandOutput::new(1, "", ""),
            },
            "clear" => {
                items.remove(&slot);
                CommandOutput::new(0, "", "")
            }
            other => panic!("unexpected secret-tool subcommand {}", other),
        }
    }

    fn powershell(&self, args: &[String], stdin: Option<&[u8]>) -> CommandOutput {
        assert!(args.contains(&"-EncodedCommand".to_string()));
        let input = String::from_utf8(stdin.expect("script input on stdin").to_vec()).unwrap();
        let mut lines = input.lines();
        let mode = lines.next().unwrap();
        let target = String::from_utf8(STANDARD.decode(lines.next().unwrap()).unwrap()).unwrap();
        let slot = ("powershell", target, String::new());
        let mut items = self.items.lock().unwrap();
        match mode {
            "set" => {
                items.insert(slot, lines.next().unwrap().to_string());
                CommandOutput::new(0, "", "")
            }
            "get" => match items.get(&slot) {
                Some(text) => CommandOutput::new(0, text.clone(), ""),
                None => CommandOutput::new(2, "", "Element not found.\r\n"),
            },
            "delete" => match items.remove(&slot) {
                Some(_) => CommandOutput::new(0, "", ""),
                None => CommandOutput::new(2, "", "Element not found.\r\n"),
            },
            other => panic!("unexpected credential mode {}", other),
        }
    }
}

impl CommandRunner for FakeTools {
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.load(Ordering::SeqCst) {
            return Ok(CommandOutput::new(
                1,
                "",
                "Cannot autolaunch D-Bus without X11 $DISPLAY",
            ));
        }

        let args = command.get_args();
        Ok(match command.program() {
            "security" => self.security(args),
            "secret-tool" => self.secret_tool(args, command.get_stdin()),
            "powershell" => self.powershell(args, command.get_stdin()),
            other => panic!("unexpected tool {}", other),
        })
    }
}

fn flag(args: &[String], name: &str) -> String {
    args.windows(2)
        .find(|pair| pair[0] == name)
        .map(|pair| pair[1].clone())
        .unwrap_or_else(|| panic!("missing {}", name))
}

fn attribute(args: &[String], name: &str) -> String {
    // Attribute pairs are always the last four arguments: service S key K
    let tail = &args[args.len() - 4..];
    assert_eq!(tail[0], "service");
    assert_eq!(tail[2], "key");
    match name {
        "service" => tail[1].clone(),
        "key" => tail[3].clone(),
        other => panic!("unknown attribute {}", other),
    }
}

/// Tool probe with a fixed answer, optionally flipped later.
pub struct FakeProbe {
    present: AtomicBool,
    probes: AtomicUsize,
}

impl FakeProbe {
    pub fn all() -> Self {
        Self {
            present: AtomicBool::new(true),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn none() -> Self {
        Self {
            present: AtomicBool::new(false),
            probes: AtomicUsize::new(0),
        }
    }

    /// Change the answer for future probes.
    pub fn set_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl ToolProbe for FakeProbe {
    fn is_available(&self, _program: &str) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.present.load(Ordering::SeqCst)
    }
}
