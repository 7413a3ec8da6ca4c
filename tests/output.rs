use tasklink::output::{format_human, HumanOutput};

#[test]
fn format_human_includes_every_part() {
    let mut human = HumanOutput::new("tasklink add: Buy milk");
    human.push_summary("id", "0a1b2c3d");
    human.push_detail("[ ] 0a1b2c3d  Buy milk");
    human.push_warning("share link is very long");
    human.push_next_step("tasklink check 0a1b2c3d");

    let rendered = format_human(&human);
    assert!(rendered.starts_with("tasklink add: Buy milk\n"));
    assert!(rendered.contains("  id  0a1b2c3d"));
    assert!(rendered.contains("  [ ] 0a1b2c3d  Buy milk"));
    assert!(rendered.contains("warning: share link is very long"));
    assert!(rendered.ends_with("try: tasklink check 0a1b2c3d"));
}

#[test]
fn format_human_omits_empty_parts() {
    let human = HumanOutput::new("https://tasklink.local/");
    let rendered = format_human(&human);
    assert_eq!(rendered, "https://tasklink.local/");
}
