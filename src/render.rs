//! Plain-text rendering of projects for the command line.

use std::fmt::Write;

use crate::projects::{ProjectRecord, ProjectStatus};

const HOOK_WIDTH: usize = 60;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Short label for a lifecycle status
pub fn status_label(status: Option<ProjectStatus>) -> &'static str {
  match status {
    Some(ProjectStatus::Recruiting) => "recruiting",
    Some(ProjectStatus::Active) => "active",
    Some(ProjectStatus::Completed) => "completed",
    None => "-",
  }
}

/// Technologies joined for display, with the lead technology bracketed
pub fn technologies(tags: &[String]) -> String {
  let mut out = String::new();
  for (i, tag) in tags.iter().enumerate() {
    if i == 0 {
      let _ = write!(out, "[{}]", tag);
    } else {
      let _ = write!(out, " {}", tag);
    }
  }
  out
}

/// One catalog line per project
pub fn list_line(project: &ProjectRecord) -> String {
  format!(
    "{:<4} {} {:<36} {:<10} {}\n     {}",
    project.id,
    project.emoji.as_deref().unwrap_or(" "),
    truncate(&project.name, 36),
    status_label(project.status),
    technologies(&project.technologies),
    truncate(&project.hook, HOOK_WIDTH),
  )
}

/// Full detail view of a project
pub fn detail(project: &ProjectRecord) -> String {
  let mut out = String::new();

  match &project.emoji {
    Some(emoji) => {
      let _ = writeln!(out, "{} {}", emoji, project.name);
    }
    None => {
      let _ = writeln!(out, "{}", project.name);
    }
  }
  let _ = writeln!(out, "{}", project.hook);
  let _ = writeln!(out);

  let _ = writeln!(out, "Status:       {}", status_label(project.status));
  if let Some(complexity) = &project.complexity {
    let _ = writeln!(out, "Complexity:   {}", complexity);
  }
  if let Some(size) = project.team_size {
    let _ = writeln!(out, "Team size:    {}", size);
  }
  if let Some(duration) = &project.duration {
    let _ = writeln!(out, "Duration:     {}", duration);
  }
  if let Some(origin) = &project.origin {
    let _ = writeln!(out, "Origin:       {}", origin);
  }
  if !project.technologies.is_empty() {
    let _ = writeln!(out, "Technologies: {}", technologies(&project.technologies));
  }
  let _ = writeln!(out, "Enroll:       {}", project.enrollment_url);

  if let Some(motivation) = &project.motivation {
    let _ = write!(out, "\nMotivation\n{}\n", motivation);
  }
  section(&mut out, "Objectives", &project.objectives);
  if let Some(description) = &project.description {
    let _ = write!(out, "\nDescription\n{}\n", description);
  }
  section(&mut out, "Concepts to learn", &project.concepts);
  section(&mut out, "Images", &project.images);

  if let Some(updated) = &project.last_updated {
    let _ = write!(out, "\nLast updated: {}\n", updated);
  }

  out
}

fn section(out: &mut String, title: &str, items: &[String]) {
  if items.is_empty() {
    return;
  }
  let _ = write!(out, "\n{}\n", title);
  for item in items {
    let _ = writeln!(out, "  - {}", item);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::projects::fallback_projects;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("¡Revoluciona!", 6), "¡Re...");
  }

  #[test]
  fn test_lead_technology_is_bracketed() {
    let tags = vec!["Rust".to_string(), "Tokio".to_string()];
    assert_eq!(technologies(&tags), "[Rust] Tokio");
    assert_eq!(technologies(&[]), "");
  }

  #[test]
  fn test_status_label() {
    assert_eq!(status_label(Some(ProjectStatus::Recruiting)), "recruiting");
    assert_eq!(status_label(None), "-");
  }

  #[test]
  fn test_detail_skips_missing_sections() {
    let project = fallback_projects()[0].clone();
    let text = detail(&project);

    assert!(text.contains("Sistema de Gestión Académica"));
    assert!(text.contains("Technologies: [React] Node.js MongoDB TypeScript"));
    assert!(text.contains("Team size:    5"));
    assert!(!text.contains("Objectives"));
    assert!(!text.contains("Motivation"));
  }

  #[test]
  fn test_detail_lists_objectives() {
    let mut project = fallback_projects()[0].clone();
    project.objectives = vec!["Aprender".to_string(), "Construir".to_string()];
    let text = detail(&project);

    assert!(text.contains("Objectives\n  - Aprender\n  - Construir\n"));
  }

  #[test]
  fn test_list_line_contains_name_and_status() {
    let project = fallback_projects()[2].clone();
    let line = list_line(&project);

    assert!(line.starts_with("3"));
    assert!(line.contains("Portal de Empleo Universitario"));
    assert!(line.contains("completed"));
    assert!(line.contains("[Vue.js]"));
  }
}
