use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use wardrobe_core::host::MemoryHost;
use wardrobe_core::persistence::{self, read_json, write_json};
use wardrobe_core::session::anchored_candidates;
use wardrobe_core::{CompileReport, Config, Wardrobe};
use wardrobe_types::finding::worst;
use wardrobe_types::{
    resolve_path, suggest_root, AssetRef, AvatarId, Controller, Finding, Menu,
    NodeId, PathKey, Scene, SceneSnapshot, Severity,
};

const USAGE: &str = "\
usage: wardrobe [-v] [--db FILE] [--config FILE] <command> [options]

commands:
  avatars                                  list avatars with a saved store
  show     --avatar ID                     print the avatar's slots
  scan     --scene FILE [--root PATH]      list candidate outfit parts
  capture  --avatar ID --scene FILE --slot N [--root PATH] [PATH...]
                                           record visibility (no PATH: all candidates)
  clear    --avatar ID --slot N
  rename   --avatar ID --slot N --name NAME
  icon     --avatar ID --slot N [--asset REF]
  root     --avatar ID [--path PATH]       set or reset the scan root hint
  compile  --avatar ID --scene FILE [--controller FILE] [--out FILE]
  validate --avatar ID --scene FILE [--controller FILE] [--menu FILE]
                                           check existing host metadata
  select   --avatar ID --scene FILE --value N [--from STATE] [--controller FILE]
                                           show which state the selector reaches";

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wardrobe")
        .join("wardrobe.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path)
        .or_else(|_| File::create(std::env::temp_dir().join("wardrobe.log")))
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("warning: logging disabled ({})", e);
            return;
        }
    };

    if WriteLogger::init(log_level, simplelog::Config::default(), log_file).is_err() {
        eprintln!("warning: logger already initialised");
        return;
    }

    log::info!("wardrobe starting (log level: {:?})", log_level);
}

/// Command line after global flags have been removed.
struct Args {
    command: String,
    rest: Vec<String>,
}

impl Args {
    fn value(&self, flag: &str) -> Option<&str> {
        self.rest
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.rest.get(i + 1))
            .map(String::as_str)
    }

    fn required(&self, flag: &str) -> Result<&str, String> {
        self.value(flag)
            .ok_or_else(|| format!("{} requires {}", self.command, flag))
    }

    fn slot(&self) -> Result<usize, String> {
        let raw = self.required("--slot")?;
        raw.parse()
            .map_err(|_| format!("--slot expects a number, got '{}'", raw))
    }

    /// Arguments that are neither flags nor flag values.
    fn positional(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut skip = false;
        for arg in &self.rest {
            if skip {
                skip = false;
                continue;
            }
            if arg.starts_with("--") {
                skip = true;
                continue;
            }
            out.push(arg.as_str());
        }
        out
    }
}

/// Pull a global `--flag VALUE` out of `args`.
fn take_value(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let i = args.iter().position(|a| a == flag)?;
    if i + 1 >= args.len() {
        args.remove(i);
        return None;
    }
    let value = args.remove(i + 1);
    args.remove(i);
    Some(value)
}

fn load_scene(path: &str) -> Result<Scene, String> {
    let snapshot: SceneSnapshot =
        read_json(Path::new(path)).map_err(|e| format!("{}: {}", path, e))?;
    Ok(Scene::from_snapshot(&snapshot))
}

fn load_controller(args: &Args) -> Result<Controller, String> {
    match args.value("--controller") {
        Some(path) => read_json(Path::new(path)).map_err(|e| format!("{}: {}", path, e)),
        None => Ok(Controller::default()),
    }
}

fn load_menu(args: &Args) -> Result<Option<Menu>, String> {
    match args.value("--menu") {
        Some(path) => read_json(Path::new(path))
            .map(Some)
            .map_err(|e| format!("{}: {}", path, e)),
        None => Ok(None),
    }
}

/// Compile into a host seeded with `--controller`, as `compile` and `select` both do.
fn compile_into_host(
    args: &Args,
    wardrobe: &Wardrobe,
    scene: &Scene,
) -> Result<(CompileReport, MemoryHost), String> {
    let mut host = MemoryHost::with_controller(load_controller(args)?);
    let report = wardrobe
        .compile(scene, &mut host)
        .map_err(|e| e.to_string())?;
    Ok((report, host))
}

/// Findings for the controller and menu given on the command line.
fn validate_supplied(args: &Args, wardrobe: &Wardrobe, scene: &Scene) -> Result<Vec<Finding>, String> {
    let controller = load_controller(args)?;
    let menu = load_menu(args)?;
    Ok(wardrobe.validate(scene, &controller, menu.as_ref()))
}

/// The node named by `--root`, if given.
fn explicit_root(args: &Args, scene: &Scene) -> Result<Option<NodeId>, String> {
    let Some(raw) = args.value("--root") else {
        return Ok(None);
    };
    resolve_path(scene, scene.root(), &PathKey::from(raw))
        .map(Some)
        .ok_or_else(|| format!("--root '{}' not found in scene", raw))
}

fn scan_root(args: &Args, scene: &Scene, wardrobe: &Wardrobe) -> Result<NodeId, String> {
    Ok(explicit_root(args, scene)?.unwrap_or_else(|| wardrobe.scan_root(scene)))
}

fn print_findings(findings: &[Finding]) {
    for finding in findings {
        eprintln!("{}", finding);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

fn run(args: Args, db: PathBuf, config: Config) -> Result<ExitCode, String> {
    let open = |args: &Args, config: Config| -> Result<Wardrobe, String> {
        let avatar = AvatarId::new(args.required("--avatar")?);
        Wardrobe::open(&db, avatar, config).map_err(|e| e.to_string())
    };

    match args.command.as_str() {
        "avatars" => {
            let conn = persistence::open_database(&db).map_err(|e| e.to_string())?;
            for avatar in persistence::list_avatars(&conn).map_err(|e| e.to_string())? {
                println!("{}", avatar);
            }
        }
        "show" => {
            let wardrobe = open(&args, config)?;
            print_json(wardrobe.store())?;
        }
        "scan" => {
            let scene = load_scene(args.required("--scene")?)?;
            let vocab = config.vocabulary();
            let root = match explicit_root(&args, &scene)? {
                Some(root) => root,
                None => suggest_root(&scene, &vocab).unwrap_or(scene.root()),
            };
            for path in anchored_candidates(&scene, root, &vocab) {
                println!("{}", path);
            }
        }
        "capture" => {
            let scene = load_scene(args.required("--scene")?)?;
            let slot = args.slot()?;
            let mut wardrobe = open(&args, config)?;
            let root = scan_root(&args, &scene, &wardrobe)?;
            let paths: Vec<PathKey> = args.positional().into_iter().map(PathKey::from).collect();
            let result = if paths.is_empty() {
                let found = anchored_candidates(&scene, root, wardrobe.vocabulary());
                wardrobe.capture(slot, &scene, found)
            } else {
                wardrobe.capture(slot, &scene, paths)
            };
            let outcome = result.map_err(|e| e.to_string())?;
            print_findings(&outcome.findings);
            println!(
                "slot {} '{}': {} objects saved",
                slot, outcome.slot.name, outcome.resolved
            );
        }
        "clear" => {
            let slot = args.slot()?;
            open(&args, config)?.clear(slot).map_err(|e| e.to_string())?;
        }
        "rename" => {
            let slot = args.slot()?;
            let name = args.required("--name")?;
            open(&args, config)?
                .rename(slot, name)
                .map_err(|e| e.to_string())?;
        }
        "icon" => {
            let slot = args.slot()?;
            let icon = args.value("--asset").map(AssetRef::new);
            open(&args, config)?
                .set_icon(slot, icon)
                .map_err(|e| e.to_string())?;
        }
        "root" => {
            let hint = args.value("--path").map(PathKey::from);
            open(&args, config)?
                .set_root_hint(hint)
                .map_err(|e| e.to_string())?;
        }
        "compile" => {
            let scene = load_scene(args.required("--scene")?)?;
            let wardrobe = open(&args, config)?;
            let (report, host) = compile_into_host(&args, &wardrobe, &scene)?;
            print_findings(&report.findings);

            let output = serde_json::json!({
                "controller": host.current_controller(),
                "menu": report.menu,
                "findings": report.findings,
            });
            match args.value("--out") {
                Some(out) => write_json(Path::new(out), &output).map_err(|e| e.to_string())?,
                None => print_json(&output)?,
            }
            if report.has_errors() {
                return Ok(ExitCode::from(1));
            }
        }
        "validate" => {
            let scene = load_scene(args.required("--scene")?)?;
            let wardrobe = open(&args, config)?;
            let findings = validate_supplied(&args, &wardrobe, &scene)?;
            print_findings(&findings);
            if worst(&findings) == Some(Severity::Error) {
                return Ok(ExitCode::from(1));
            }
        }
        "select" => {
            let scene = load_scene(args.required("--scene")?)?;
            let raw = args.required("--value")?;
            let value: i32 = raw
                .parse()
                .map_err(|_| format!("--value expects an integer, got '{}'", raw))?;
            let wardrobe = open(&args, config)?;
            let (report, _) = compile_into_host(&args, &wardrobe, &scene)?;
            let from = args.value("--from").unwrap_or(&report.layer.default_state);
            println!("{}", report.layer.evaluate(from, value));
        }
        other => return Err(format!("unknown command '{}'\n\n{}", other, USAGE)),
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let mut raw: Vec<String> = std::env::args().skip(1).collect();
    let verbose = raw.iter().any(|a| a == "--verbose" || a == "-v");
    raw.retain(|a| a != "--verbose" && a != "-v");
    init_logging(verbose);

    if raw.iter().any(|a| a == "--help" || a == "-h") || raw.is_empty() {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let config = match take_value(&mut raw, "--config") {
        Some(path) => Config::load_from(Path::new(&path)),
        None => Config::load(),
    };
    let db = match take_value(&mut raw, "--db")
        .map(PathBuf::from)
        .or_else(|| config.database_path())
    {
        Some(db) => db,
        None => {
            eprintln!("error: no data directory; pass --db FILE");
            return ExitCode::from(2);
        }
    };

    let command = raw.remove(0);
    let args = Args { command, rest: raw };
    match run(args, db, config) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}
