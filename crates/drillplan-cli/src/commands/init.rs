//! The `drillplan init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    for (name, content) in [
        ("drillplan.toml", SAMPLE_CONFIG),
        ("catalog.toml", SAMPLE_CATALOG),
        ("profiles.toml", SAMPLE_PROFILES),
    ] {
        if Path::new(name).exists() {
            println!("{name} already exists, skipping.");
        } else {
            std::fs::write(name, content)?;
            println!("Created {name}");
        }
    }

    println!("\nNext steps:");
    println!("  1. Add your items to catalog.toml and learners to profiles.toml");
    println!("  2. Run: drillplan validate");
    println!("  3. Run: drillplan plan --user kid --commit");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# drillplan configuration

catalog = "catalog.toml"
profiles = "profiles.toml"
journal = "journal.json"
default_subject = "ch_zici"
"#;

const SAMPLE_CATALOG: &str = r#"[[subjects]]
name = "ch_zici"

[[subjects.items]]
item_id = 101
grade = 3
volume = 1
lesson = 1
prompt = "shān"
answer = "山"

[[subjects.items]]
item_id = 102
grade = 3
volume = 1
lesson = 1
prompt = "shuǐ"
answer = "水"

[[subjects.items]]
item_id = 201
grade = 3
volume = 1
lesson = 2
prompt = "huǒ"
answer = "火"

[[subjects]]
name = "en_word"

[[subjects.items]]
item_id = 1
grade = 3
volume = 1
unit = 1
prompt = "苹果"
answer = "apple"
"#;

const SAMPLE_PROFILES: &str = r#"[[classes]]
class_id = "class-1"
grade = 3
volume = 1

[[users]]
username = "kid"
identity = "student"
class_id = "class-1"

[users.settings]
ch_zici_max_num = 10
ch_zici_incorrect_ratio = 0.3
ch_zici_correct_ratio = 0.2
ch_zici_new_ratio = 0.5
ch_zici_learning_speed = 2
ch_zici_learning_path = [1, 2]
ch_zici_pass_ratio = 0.8

[[users]]
username = "teacher"
identity = "teacher"

[[users.roles]]
role_id = "cn_teacher"
class_id = "class-1"
"#;
