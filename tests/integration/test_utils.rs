//! Shared fixtures for integration tests.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;
use weld::config::WeldConfig;
use weld::provider::ProviderConfig;

// HOME, XDG_CONFIG_HOME and WELD__* are process-wide
static ENV_MUTEX: Mutex<()> = Mutex::new(());

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct EnvGuard {
    saved: Vec<(&'static str, Option<std::ffi::OsString>)>,
}

impl EnvGuard {
    pub fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
        let saved = vars
            .iter()
            .map(|(key, value)| {
                let old = std::env::var_os(key);
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
                (*key, old)
            })
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

pub const APP_TS: &str = "import { Inject } from './inject';
import { Greeter } from './greeter';
import { Repo } from './repo';

export class App {
  @Inject greeter: Greeter;
  @Inject repo: Repo;

  run(): string {
    this.repo.save('last', 'world');
    return this.greeter.greet('world');
  }
}
";

pub const INJECT_TS: &str = "export function Inject(target: object, key: string): void {}
";

pub const GREETER_TS: &str = "export interface Greeter {
  greet(name: string): string;
  farewell(name: string): string;
}
";

pub const REPO_TS: &str = "export abstract class Repo {
  abstract find(id: string): string | undefined;
  abstract save(id: string, value: string): void;
}
";

/// Temporary TypeScript workspace with an app injecting `Greeter` and `Repo`.
pub struct Workspace {
    _temp: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = dunce::canonicalize(temp.path()).unwrap();
        let ws = Self { _temp: temp, root };
        ws.write("src/app.ts", APP_TS);
        ws.write("src/inject.ts", INJECT_TS);
        ws.write("src/greeter.ts", GREETER_TS);
        ws.write("src/repo.ts", REPO_TS);
        ws
    }

    pub fn write(&self, relative: &str, text: &str) {
        let path = self.root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.root.join(relative).exists()
    }
}

/// Default configuration with the default provider pointed at `endpoint`.
pub fn config_for(endpoint: &str) -> WeldConfig {
    let mut config = WeldConfig::default();
    let mut provider = ProviderConfig::http(endpoint);
    provider.default_model = Some("test-model".to_string());
    config.providers.insert("default".to_string(), provider);
    config
}

pub fn greeter_impl(with_farewell: bool) -> String {
    let farewell = if with_farewell {
        "\n  farewell(name: string): string {\n    return `Goodbye, ${name}`;\n  }\n"
    } else {
        ""
    };
    format!(
        "Here is the implementation:\n\n```typescript\nimport {{ Greeter }} from '../greeter';\n\nexport class GreeterImpl implements Greeter {{\n  greet(name: string): string {{\n    return `Hello, ${{name}}`;\n  }}\n{}}}\n```\n",
        farewell
    )
}

pub const REPO_IMPL: &str = "```ts
export class RepoImpl extends Repo {
  private items = new Map<string, string>();

  find(id: string): string | undefined {
    return this.items.get(id);
  }

  save(id: string, value: string): void {
    this.items.set(id, value);
  }
}
```";
