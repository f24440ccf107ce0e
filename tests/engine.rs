// Command engine tests: startup, built-in commands, execution modes and
// error recovery, driven through scripted input.

mod common;

use aitess::cache::{CacheLoad, CacheStore};
use aitess::error::FailureKind;
use aitess::line_source::ScriptedSource;
use aitess::symbol::{Entry, EntryData, SymbolTable};
use aitess::StepOutcome;
use common::{engine, engine_with, started, workspace, write_config, write_file};
use std::fs;

const BASIC_CONFIG: &str = "\
project = demo ! flight test rig
uut = adc
tpfpath = {dir}/
rdfpath = {dir}/
";

#[test]
fn startup_configures_uut_and_runs_commands() {
    let dir = workspace(BASIC_CONFIG);
    let (mut engine, output) = started(dir.path(), &["x := 41", "print x", "exit"]);
    engine.run().unwrap();

    let text = output.contents();
    assert!(text.contains("Message: AITESS configured for ADC"), "{text}");
    assert!(text.contains("\n>>> print x\n41\n"), "{text}");
}

#[test]
fn unknown_uut_defaults_to_ladc() {
    let dir = workspace("uut = xyz\n");
    let (_engine, output) = started(dir.path(), &[]);
    assert!(output
        .contents()
        .contains("Message: UUT not/incorrectly specified, AITESS configured for LADC/DFCC Mk1"));
}

#[test]
fn malformed_configuration_stops_startup() {
    let dir = workspace("project = demo\nthis is not an option\n");
    let (mut engine, output) = engine(dir.path(), &[]);
    let failure = engine.startup().unwrap_err();

    assert_eq!(failure.kind(), FailureKind::Config);
    let text = output.contents();
    assert!(text.contains("Environment Initialization Error : ConfigurationFileError: Syntax error on line number 2 in configuration file, AITESS cannot continue without fixing the error"), "{text}");
}

#[test]
fn configuration_entries_load_database_files() {
    let dir = workspace(
        "sysdbfpath = {dir}/\nsysdbf = db.dat\nusrdbfpath = {dir}/\nusrdbf = missing.dat\n",
    );
    write_file(dir.path(), "db.dat", "symb alt addr=0x10 dtype=u16\nspeed := 250\n");
    let (engine, output) = started(dir.path(), &[]);

    let symbols = &engine.session().symbols;
    assert!(symbols.get("alt").is_some_and(Entry::is_symbol));
    let speed = symbols.get("speed").unwrap();
    assert!(speed.source.as_deref().unwrap().ends_with("db.dat"));
    // display state is restored once the configuration has run
    assert!(engine.session().display_state);

    let config = engine.session().config.as_ref().unwrap();
    assert_eq!(config.raw_value("usrdbf"), "missing.dat");
    assert_eq!(config.value("usrdbf"), "");
    assert!(output
        .contents()
        .contains("config.dat: 'usrdbf=missing.dat' => 'usrdbf=«nil»'"));
}

#[test]
fn failing_database_file_is_reported_and_startup_continues() {
    let dir = workspace(
        "sysdbfpath = {dir}/\nsysdbf = bad.dat\nusrdbfpath = {dir}/\nusrdbf = good.dat\n",
    );
    write_file(dir.path(), "bad.dat", "nonsense here\n");
    write_file(dir.path(), "good.dat", "limit := 7\n");
    let (engine, output) = started(dir.path(), &[]);

    let text = output.contents();
    assert!(
        text.contains("Configuration File Error: System Database File : Error: Syntax error, unexpected 'nonsense'"),
        "{text}"
    );
    assert!(engine.session().symbols.contains("limit"));
    assert!(engine.session().sources.is_empty());
}

#[test]
fn startup_script_exit_is_a_warning() {
    let dir = workspace(BASIC_CONFIG);
    write_file(dir.path(), "startup.tpf", "ready := 1\nexit\nnever := 2\n");
    let (engine, output) = started(dir.path(), &[]);

    assert!(output
        .contents()
        .contains("Environment Initialization Error : Exit Warning: Startup script exited"));
    assert!(engine.session().symbols.contains("ready"));
    assert!(!engine.session().symbols.contains("never"));
}

#[test]
fn cache_is_written_and_reused() {
    let config = "usecache = TRUE\nsysdbfpath = {dir}/\nsysdbf = db.dat\n";
    let dir = workspace(config);
    write_file(dir.path(), "db.dat", "gain := 3\n");

    let (_first, output) = started(dir.path(), &[]);
    assert!(!output.contents().contains("Using cached"));
    assert!(dir.path().join("config.cache").exists());

    // the database file no longer exists, so the symbols can only come from the cache
    fs::remove_file(dir.path().join("db.dat")).unwrap();
    let (second, output) = started(dir.path(), &[]);
    assert!(output.contents().contains("Message: Using cached 'config.dat'"));
    assert!(second.session().symbols.contains("gain"));
}

#[test]
fn stale_cache_is_rebuilt() {
    let dir = workspace("usecache = true\nsysdbfpath = {dir}/\nsysdbf = db.dat\n");
    write_file(dir.path(), "db.dat", "gain := 3\n");
    let cache_path = dir.path().join("config.cache");
    let mut old = SymbolTable::new();
    old.insert(Entry::new("obsolete", EntryData::Macro("x".into()), None));
    CacheStore::new(&cache_path, "0.0.0-old").save(&mut old).unwrap();

    let (engine, output) = started(dir.path(), &[]);
    assert!(!output.contents().contains("Using cached"));
    assert!(engine.session().symbols.contains("gain"));
    assert!(!engine.session().symbols.contains("obsolete"));

    match CacheStore::new(&cache_path, aitess::RUNTIME_VERSION).load().unwrap() {
        CacheLoad::Fresh(table) => assert!(table.contains("gain")),
        CacheLoad::Stale { found } => panic!("cache still stale: {found}"),
    }
}

#[test]
fn cache_disabled_still_refreshes_snapshot() {
    let dir = workspace("usecache = banana\nsysdbfpath = {dir}/\nsysdbf = db.dat\n");
    write_file(dir.path(), "db.dat", "gain := 3\n");
    let (_first, _) = started(dir.path(), &[]);
    let (_second, output) = started(dir.path(), &[]);

    assert!(!output.contents().contains("Using cached"));
    assert!(dir.path().join("config.cache").exists());
}

#[test]
fn nested_auto_recovers_each_line() {
    let dir = workspace(BASIC_CONFIG);
    write_file(dir.path(), "a.tpf", "x := 1\nauto b.tpf\nprint x\n");
    write_file(dir.path(), "b.tpf", "y := 2\nbogus\nz := 3\n");
    let (mut engine, output) = started(dir.path(), &[]);

    let outcome = engine.execute_line("auto a.tpf", false);
    assert_eq!(outcome, StepOutcome::Completed);
    assert_eq!(engine.session().modes.auto_depth(), 0);
    for name in ["x", "y", "z"] {
        assert!(engine.session().symbols.contains(name), "{name} missing");
    }
    let text = output.contents();
    assert!(text.contains(">>> bogus\nError: Syntax error, unexpected 'bogus'"), "{text}");
    assert!(text.contains(">>> print x\n1\n"), "{text}");
}

#[test]
fn self_invoking_auto_is_stopped() {
    let dir = workspace(BASIC_CONFIG);
    write_file(dir.path(), "loop.tpf", "auto loop.tpf\n");
    write_file(dir.path(), "ping.tpf", "auto pong.tpf\n");
    write_file(dir.path(), "pong.tpf", "auto ping.tpf\n");
    let (mut engine, output) = started(dir.path(), &[]);

    assert_eq!(engine.execute_line("auto loop.tpf", false), StepOutcome::Completed);
    assert_eq!(engine.session().modes.auto_depth(), 0);
    assert_eq!(engine.execute_line("auto ping.tpf", false), StepOutcome::Completed);
    assert_eq!(engine.session().modes.auto_depth(), 0);

    let text = output.contents();
    assert_eq!(
        text.matches("Error: Deeply nested 'auto' batch file execution, possibly cyclic (depth 64)")
            .count(),
        2,
        "{text}"
    );
    engine.execute_line("after := 1", false);
    assert!(engine.session().symbols.contains("after"));
}

#[test]
fn missing_auto_file_is_reported() {
    let dir = workspace(BASIC_CONFIG);
    let (mut engine, output) = started(dir.path(), &[]);
    engine.execute_line("auto nothing.tpf", false);

    let text = output.contents();
    assert!(text.contains("Error: Batch file '"), "{text}");
    assert!(text.contains("nothing.tpf' I/O error, "), "{text}");
    assert!(!engine.session().modes.is_auto());
}

#[test]
fn man_and_auto_exclude_each_other() {
    let dir = workspace(BASIC_CONFIG);
    write_file(dir.path(), "plan.tpf", "man\nstep := 1\n");
    let (mut engine, output) = started(dir.path(), &[]);

    engine.execute_line("auto plan.tpf", false);
    assert!(output
        .contents()
        .contains("Error: Cannot enter 'man' mode while executing in 'auto' mode."));
    assert!(!engine.session().modes.is_man());

    engine.execute_line("man", false);
    assert!(engine.session().modes.is_man());
    assert_eq!(engine.prompt(), "(MODE=MAN)>>> ");
    engine.execute_line("auto plan.tpf", false);
    assert!(output
        .contents()
        .contains("Error: Cannot enter 'auto' mode while executing in 'man' mode."));
    engine.execute_line("print 5", false);
    engine.execute_line("man", false);
    assert!(!engine.session().modes.is_man());

    let report = fs::read_to_string(dir.path().join("man.rdf")).unwrap();
    assert!(report.contains("auto plan.tpf"), "{report}");
    assert!(report.contains("print 5\n5\n"), "{report}");
}

#[test]
fn builtin_usage_errors_do_not_abort() {
    let dir = workspace(BASIC_CONFIG);
    let (mut engine, output) = started(dir.path(), &[]);

    assert_eq!(engine.execute_line("exit now", false), StepOutcome::Completed);
    assert_eq!(engine.execute_line("auto", false), StepOutcome::Completed);
    engine.execute_line("high_priority maybe", false);
    engine.execute_line("edit_symbol alt", false);

    let text = output.contents();
    assert!(text.contains("Error: System command 'exit' has no parameters."));
    assert!(text.contains("Error: System command 'auto' expects one parameter."));
    assert!(text.contains("Error: Unknown parameter 'maybe' for system command 'high_priority'."));
    assert!(text.contains("Error: System command 'edit_symbol' expects two parameters."));
    assert_eq!(engine.execute_line("  EXIT  ", false), StepOutcome::Exit);
}

#[test]
fn toggles_report_and_change_state() {
    let dir = workspace(BASIC_CONFIG);
    let (mut engine, output) = started(dir.path(), &[]);

    engine.execute_line("skip_evaluation on", false);
    assert!(engine.front_end().skip_evaluation());
    engine.execute_line("ghost := 1", false);
    assert!(!engine.session().symbols.contains("ghost"));
    engine.execute_line("skip_evaluation", false);
    engine.execute_line("Profile_Level 2", false);
    engine.execute_line("profile_level 9", false);

    let text = output.contents();
    assert!(text.contains("skip_evaluation set to 'on'"));
    assert!(text.contains("skip_evaluation is 'on'"));
    assert!(text.contains("profile_level set to 2"));
    assert!(text.contains("Error: Unknown parameter '9' for system command 'profile_level'."));
    assert_eq!(engine.front_end().profile_level(), 2);
}

#[test]
fn failures_render_with_position_and_clear_sources() {
    let dir = workspace(BASIC_CONFIG);
    write_file(dir.path(), "inner.tpf", "ok := 1\nfrobnicate 3\n");
    let (mut engine, output) = started(dir.path(), &[]);

    let outcome = engine.execute_line("@inner.tpf", false);
    assert_eq!(outcome, StepOutcome::Failed(FailureKind::Parse));
    assert!(engine.session().sources.is_empty());
    let text = output.contents();
    assert!(
        text.contains("Error: Syntax error, unexpected 'frobnicate' (file '"),
        "{text}"
    );
    assert!(text.contains("inner.tpf', line 2)\n  | frobnicate 3"), "{text}");
}

#[test]
fn display_off_hides_results_and_marks_prompt() {
    let dir = workspace(BASIC_CONFIG);
    let (mut engine, output) = started(dir.path(), &[]);
    output.clear();

    engine.execute_line("display off", false);
    engine.execute_line("print 12345", false);
    assert_eq!(engine.prompt(), "(DISP=OFF)>>> ");
    assert!(!output.contents().contains("12345"));

    engine.execute_line("man", false);
    assert_eq!(engine.prompt(), "(DISP=OFF, MODE=MAN)>>> ");
}

#[test]
fn line_comments_skip_trailing_newline() {
    let dir = workspace(BASIC_CONFIG);
    let (mut engine, output) = started(dir.path(), &[]);
    output.clear();

    engine.execute_line("! just a note", false);
    assert_eq!(output.contents(), "");
    engine.execute_line("!# block #!", false);
    assert_eq!(output.contents(), "\n");
    output.clear();
    engine.execute_line("clear", false);
    assert_eq!(output.contents(), aitess::console::CLEAR_SCREEN);
}

#[test]
fn purge_file_asks_before_removing() {
    let dir = workspace("sysdbfpath = {dir}/\nsysdbf = db.dat\n");
    write_file(dir.path(), "db.dat", "symb alt addr=0x10\nspeed := 250\n");
    let (mut engine, output) = engine_with(
        dir.path(),
        ScriptedSource::new(["maybe", "n", "Y"]),
    );
    engine.startup().unwrap();
    engine.execute_line("typed := 1", false);

    engine.execute_line("purge_file db.dat", false);
    assert!(engine.session().symbols.contains("alt"));
    engine.execute_line("purge_file db.dat", false);
    assert!(!engine.session().symbols.contains("alt"));
    assert!(!engine.session().symbols.contains("speed"));
    assert!(engine.session().symbols.contains("typed"));

    let text = output.contents();
    assert!(text.contains("Trying to purge names loaded from file 'db.dat'...done."));
}

#[test]
fn purge_menu_validates_choices() {
    let dir = workspace("sysdbfpath = {dir}/\nsysdbf = db.dat\n");
    write_file(dir.path(), "db.dat", "speed := 250\n");
    let (mut engine, output) = engine_with(
        dir.path(),
        ScriptedSource::new(["abc", "7", "1", "y", "0"]),
    );
    engine.startup().unwrap();

    engine.execute_line("purge_file", false);
    let text = output.contents();
    assert!(text.contains("Purge File"));
    assert!(text.contains("  1 : "));
    assert!(text.contains("Error: Expected a number."));
    assert!(text.contains("Error: Invalid choice."));
    assert!(engine.session().symbols.is_empty());
}

#[test]
fn edit_symbol_updates_attribute() {
    let dir = workspace("sysdbfpath = {dir}/\nsysdbf = db.dat\n");
    write_file(dir.path(), "db.dat", "symb alt addr=0x10\nspeed := 250\n");
    let (mut engine, output) =
        engine_with(dir.path(), ScriptedSource::new(["0x2f", "zz", "101"]));
    engine.startup().unwrap();

    engine.execute_line("edit_symbol alt addr", false);
    engine.execute_line("edit_symbol alt mask", false);
    engine.execute_line("edit_symbol nobody addr", false);
    engine.execute_line("edit_symbol speed addr", false);
    engine.execute_line("edit_symbol alt colour", false);
    engine.execute_line("EDIT_SYMBOL ALT CHAN", false);

    let text = output.contents();
    assert!(text.contains("Updated the attribute value."));
    assert!(text.contains("Error: Attribute value not updated due to incorrect/empty given value."));
    assert!(text.contains("Error: Name not found."));
    assert!(text.contains("Error: Name not a symbol."));
    assert!(text.contains("Error: Invalid attribute or editing of attribute not supported."));

    let attributes = engine
        .session_mut()
        .symbols
        .symbol_attributes_mut("alt")
        .unwrap();
    assert_eq!(attributes.addr, Some(0x2f));
    assert_eq!(attributes.mask, None);
    assert_eq!(attributes.chan, Some(0b101));
    assert_eq!(text.matches("Updated the attribute value.").count(), 2);
}

#[test]
fn reload_configuration_picks_up_edits() {
    let dir = workspace("sysdbfpath = {dir}/\nsysdbf = one.dat\n");
    write_file(dir.path(), "one.dat", "first := 1\n");
    write_file(dir.path(), "two.dat", "second := 2\n");
    let (mut engine, output) = engine_with(dir.path(), ScriptedSource::new(["y", "y"]));
    engine.startup().unwrap();
    assert!(engine.session().symbols.contains("first"));

    write_config(dir.path(), "sysdbfpath = {dir}/\nsysdbf = two.dat\n");
    engine.execute_line("reload_configuration", false);
    assert!(engine.session().symbols.contains("second"));
    assert!(!engine.session().symbols.contains("first"));

    // a broken file is reported and the previous configuration stays usable
    write_config(dir.path(), "sysdbf two.dat\n");
    engine.execute_line("reload_configuration", false);
    assert!(output
        .contents()
        .contains("Syntax error on line number 1 in configuration file"));
    assert_eq!(engine.session().config_value("sysdbf"), "two.dat");
}

#[test]
fn list_configuration_marks_empty_values() {
    let dir = workspace("project = demo\nsysdbf = foo.dat\n");
    let (mut engine, output) = started(dir.path(), &[]);
    engine.execute_line("list_configuration", false);

    let text = output.contents();
    assert!(text.contains("Configuration information"));
    assert!(text.contains("     project       = demo"));
    assert!(text.contains("     sysdbf        = «nil»"));
    assert!(text.contains("     usecache      = false"));
}

#[test]
fn shared_memory_commands_reach_transport() {
    let dir = workspace(BASIC_CONFIG);
    let (mut engine, output) = started(dir.path(), &[]);
    engine.execute_line("shm_info", false);
    engine.execute_line("shm_clear", false);

    let text = output.contents();
    assert!(text.contains("Shared memory information"));
    assert!(text.contains("  in     = 0x00000000"));
    assert!(text.contains("  error  = 0x00000000"));
    assert!(text.contains("Shared memory cleared"));
    assert!(!text.contains("Memory allocation failed"));
}

#[test]
fn end_of_input_closes_audit_log() {
    let dir = workspace(BASIC_CONFIG);
    let mut input = ScriptedSource::new(["print 1"]);
    input.interrupt();
    input.push_line("logging off");
    input.push_line("secret := 9");
    input.push_line("logging on");
    let (mut engine, _output) = engine_with(dir.path(), input);
    engine.startup().unwrap();
    engine.run().unwrap();

    let log = fs::read_to_string(dir.path().join("aitess.log")).unwrap();
    assert!(log.contains("<BEG>Session began on "), "{log}");
    assert!(log.contains(">>> print 1"), "{log}");
    assert!(!log.contains("secret"), "{log}");
    assert!(log.contains(">>> exit (^D)"), "{log}");
    assert!(log.contains("<END>Session ended on "), "{log}");
}
