//! Built-in catalog served when Firestore cannot be reached.

use super::types::{ProjectList, ProjectRecord, ProjectStatus};

struct Seed {
  id: &'static str,
  name: &'static str,
  hook: &'static str,
  technologies: &'static [&'static str],
  enrollment_url: &'static str,
  team_size: u32,
  duration: &'static str,
  status: ProjectStatus,
}

const PLACEHOLDER_EMOJI: &str = "✖️";

const SEEDS: &[Seed] = &[
  Seed {
    id: "1",
    name: "Sistema de Gestión Académica",
    hook: "¡Revoluciona la gestión académica con esta plataforma!",
    technologies: &["React", "Node.js", "MongoDB", "TypeScript"],
    enrollment_url: "https://forms.gle/ejemplo1",
    team_size: 5,
    duration: "4 meses",
    status: ProjectStatus::Recruiting,
  },
  Seed {
    id: "2",
    name: "App de Sostenibilidad Campus",
    hook: "¡Salva el planeta desde tu campus con esta app!",
    technologies: &["React Native", "Firebase", "Python"],
    enrollment_url: "https://forms.gle/ejemplo2",
    team_size: 4,
    duration: "3 meses",
    status: ProjectStatus::Active,
  },
  Seed {
    id: "3",
    name: "Portal de Empleo Universitario",
    hook: "¡Encuentra tu trabajo soñado con esta plataforma!",
    technologies: &["Vue.js", "Django", "PostgreSQL"],
    enrollment_url: "https://forms.gle/ejemplo3",
    team_size: 6,
    duration: "5 meses",
    status: ProjectStatus::Completed,
  },
  Seed {
    id: "4",
    name: "Sistema de Biblioteca Digital",
    hook: "¡La biblioteca del futuro está aquí!",
    technologies: &["Angular", "Spring Boot", "MySQL"],
    enrollment_url: "https://forms.gle/ejemplo4",
    team_size: 4,
    duration: "3 meses",
    status: ProjectStatus::Recruiting,
  },
  Seed {
    id: "5",
    name: "App de Carpooling Estudiantil",
    hook: "¡Comparte viajes y ahorra dinero con otros estudiantes!",
    technologies: &["Flutter", "Node.js", "MongoDB"],
    enrollment_url: "https://forms.gle/ejemplo5",
    team_size: 5,
    duration: "4 meses",
    status: ProjectStatus::Active,
  },
  Seed {
    id: "6",
    name: "Plataforma de Tutorías",
    hook: "¡Conecta con tutores expertos y mejora tus notas!",
    technologies: &["React", "Express", "PostgreSQL"],
    enrollment_url: "https://forms.gle/ejemplo6",
    team_size: 3,
    duration: "2 meses",
    status: ProjectStatus::Recruiting,
  },
];

impl Seed {
  fn to_record(&self) -> ProjectRecord {
    ProjectRecord {
      id: self.id.to_string(),
      name: self.name.to_string(),
      hook: self.hook.to_string(),
      technologies: self.technologies.iter().map(|t| t.to_string()).collect(),
      enrollment_url: self.enrollment_url.to_string(),
      complexity: None,
      origin: None,
      motivation: None,
      objectives: Vec::new(),
      description: None,
      concepts: Vec::new(),
      images: Vec::new(),
      last_updated: None,
      emoji: Some(PLACEHOLDER_EMOJI.to_string()),
      team_size: Some(self.team_size),
      duration: Some(self.duration.to_string()),
      status: Some(self.status),
    }
  }
}

/// The built-in catalog, in display order.
pub fn projects() -> ProjectList {
  SEEDS.iter().map(Seed::to_record).collect()
}
