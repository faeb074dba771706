use crate::model::{Class, Student};

/// Fields a record is matched against by [`filter`].
pub trait Searchable {
    fn search_fields(&self) -> [&str; 3];
}

impl Searchable for Class {
    fn search_fields(&self) -> [&str; 3] {
        [&self.name, &self.grade, &self.teacher]
    }
}

impl Searchable for Student {
    fn search_fields(&self) -> [&str; 3] {
        [&self.name, &self.email, &self.student_id]
    }
}

/// Case-insensitive substring match; `needle` must already be lowercased.
pub fn matches<T: Searchable>(record: &T, needle: &str) -> bool {
    record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Records matching `query`, in source order. A blank query keeps everything.
///
/// Full scan per call; collections are classroom-sized.
pub fn filter<T: Searchable + Clone>(records: &[T], query: &str) -> Vec<T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| matches(*r, &needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{class, student};

    fn classes() -> Vec<Class> {
        vec![
            class(1, "Turma A", "6º Ano", "Maria Silva"),
            class(2, "Turma B", "7º Ano", "João Santos"),
            class(3, "Reforço", "6º Ano", "Professor Exemplo"),
        ]
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let all = classes();
        assert_eq!(filter(&all, ""), all);
        assert_eq!(filter(&all, "   "), all);
    }

    #[test]
    fn matches_any_class_field_ignoring_case() {
        let all = classes();
        let ids = |q: &str| filter(&all, q).iter().map(|c| c.id.0).collect::<Vec<_>>();
        assert_eq!(ids("turma"), vec![1, 2]);
        assert_eq!(ids("6º"), vec![1, 3]);
        assert_eq!(ids("JOÃO"), vec![2]);
        assert_eq!(ids("REFORÇO"), vec![3]);
        assert!(ids("9º Ano").is_empty());
    }

    #[test]
    fn students_match_on_email_and_display_id() {
        let mut ana = student(1, "EST001", "Ana", 1);
        ana.email = "ana@x.com".to_string();
        let bruno = student(2, "EST002", "Bruno", 1);
        let all = vec![ana, bruno];

        assert_eq!(filter(&all, "X.COM").len(), 1);
        assert_eq!(filter(&all, "est002")[0].name, "Bruno");
        assert_eq!(filter(&all, "est").len(), 2);
    }

    #[test]
    fn filtering_is_idempotent() {
        let all = classes();
        for q in ["", "a", "maria", "7º", "zzz"] {
            let once = filter(&all, q);
            assert_eq!(filter(&once, q), once, "query {q:?}");
        }
    }
}
