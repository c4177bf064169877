//! Property-based tests for normalization and registry assembly

use proptest::prelude::*;
use std::path::{Path, PathBuf};
use weld::analysis::{Project, Target};
use weld::normalizer::Normalizer;
use weld::wiring::{assemble, PropertyDep, ServiceRecord};

fn project() -> Project {
    let project = Project::new("/p");
    project.add_source(
        Path::new("/p/src/repo.ts"),
        "import { DB } from './db';\n\nexport abstract class Repo {\n  db: DB;\n  abstract find(id: string): string;\n}\n",
    );
    project.add_source(
        Path::new("/p/src/db.ts"),
        "export interface DB {\n  query(sql: string): string[];\n}\n",
    );
    project.add_source(
        Path::new("/p/src/greeter.ts"),
        "export interface Greeter {\n  greet(name: string): string;\n}\n",
    );
    project.add_source(
        Path::new("/p/src/models/user.ts"),
        "export interface User {\n  id: string;\n}\n\nexport enum Role { Admin, Member }\n",
    );
    project
}

/// Class text for `target` with helper methods and references to project types.
fn class_text(target: &str, helpers: &[String], uses: &[&str]) -> String {
    let mut body = String::new();
    if target == "Repo" {
        body.push_str("  db: DB;\n");
        body.push_str("  find(id: string): string {\n    return id;\n  }\n");
    } else {
        body.push_str("  greet(name: string): string {\n    return `Hello, ${name}`;\n  }\n");
    }
    for (i, helper) in helpers.iter().enumerate() {
        let value = uses.get(i).copied().unwrap_or("0");
        body.push_str(&format!(
            "  private {}(): unknown {{\n    return {};\n  }}\n",
            helper, value
        ));
    }
    let relation = if target == "Repo" { "implements" } else { "extends" };
    format!(
        "export class {}Impl {} {} {{\n{}}}\n",
        target, relation, target, body
    )
}

fn raw_output() -> impl Strategy<Value = (bool, String)> {
    (
        any::<bool>(),
        prop::sample::select(vec!["", "Here is the implementation:\n\n", "Sure!\n"]),
        prop::option::of(prop::sample::select(vec!["typescript", "ts", ""])),
        prop::collection::vec("[A-Z][a-z]{0,6}", 0..4),
        prop::collection::vec(
            prop::sample::select(vec!["Role.Admin", "({ id: 'u' } as User)", "this.name()"]),
            0..4,
        ),
        prop::sample::select(vec!["", "\nLet me know if you need changes.", "\n"]),
    )
        .prop_map(|(is_repo, prose, fence, suffixes, uses, trailer)| {
            let target = if is_repo { "Repo" } else { "Greeter" };
            let helpers: Vec<String> = suffixes.iter().map(|s| format!("helper{}", s)).collect();
            let class = class_text(target, &helpers, &uses);
            let code = match fence {
                Some(lang) => format!("```{}\n{}```", lang, class),
                None => class,
            };
            (is_repo, format!("{}{}{}", prose, code, trailer))
        })
}

/// Normalizing already-normalized output changes nothing
#[test]
fn test_normalize_is_idempotent() {
    let project = project();
    let normalizer = Normalizer::new(&project);
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&raw_output(), |(is_repo, raw)| {
            let name = if is_repo { "Repo" } else { "Greeter" };
            let target = Target::from_declaration(project.find_type(name).unwrap()).unwrap();
            let output = PathBuf::from(format!("/p/src/generated/{}Impl.ts", name));

            let once = normalizer.normalize(&raw, &target, &output);
            let twice = normalizer.normalize(&once, &target, &output);
            prop_assert_eq!(&once, &twice);
            prop_assert!(!once.contains("```"));
            Ok(())
        })
        .unwrap();
}

fn record(name: &str, deps: &[&str]) -> ServiceRecord {
    ServiceRecord {
        target_name: name.to_string(),
        impl_name: format!("{}Impl", name),
        impl_path: PathBuf::from(format!("/p/src/generated/{}Impl.ts", name)),
        constructor_deps: deps.iter().map(|d| d.to_string()).collect(),
        property_deps: vec![PropertyDep {
            name: "clock".to_string(),
            type_name: "Clock".to_string(),
        }],
    }
}

/// The wiring module does not depend on the order records arrive in
#[test]
fn test_assemble_order_independence() {
    let records = vec![
        record("Clock", &[]),
        record("Logger", &["Clock"]),
        record("UserRepo", &["Logger", "DB"]),
        record("DB", &[]),
        record("IMailer", &["Logger"]),
    ];
    let dir = Path::new("/p/src/generated");
    let expected = assemble(&records, dir);
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&Just(records).prop_shuffle(), |shuffled| {
            prop_assert_eq!(assemble(&shuffled, dir), expected.clone());
            Ok(())
        })
        .unwrap();
}
