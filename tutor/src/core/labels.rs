//! Display labels derived from lesson file names.

/// Turn a lesson file name into a title.
///
/// Strips `.{extension}`, replaces `-` and `_` with spaces, then title-cases:
/// a letter is uppercased when the preceding character is not a letter and
/// lowercased otherwise (`"01-intro_to-PYTHON.ipynb"` -> `"01 Intro To Python"`).
pub fn label_for(id: &str, extension: &str) -> String {
    let suffix = format!(".{extension}");
    let stem = id.strip_suffix(suffix.as_str()).unwrap_or(id);
    title_case(&stem.replace(['-', '_'], " "))
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_cased = false;
    for ch in text.chars() {
        if is_cased(ch) {
            if prev_cased {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(ch);
            prev_cased = false;
        }
    }
    out
}

fn is_cased(ch: char) -> bool {
    ch.is_lowercase() || ch.is_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_separators_and_strips_extension() {
        assert_eq!(label_for("intro-to_python.ipynb", "ipynb"), "Intro To Python");
    }

    #[test]
    fn lowercases_inside_words() {
        assert_eq!(label_for("NUMPY_basics.ipynb", "ipynb"), "Numpy Basics");
    }

    #[test]
    fn letters_after_digits_start_a_word() {
        assert_eq!(label_for("01-1st_lesson.ipynb", "ipynb"), "01 1St Lesson");
    }

    #[test]
    fn extension_only_stripped_as_suffix() {
        assert_eq!(label_for("ipynb-notes.ipynb", "ipynb"), "Ipynb Notes");
        assert_eq!(label_for("readme.txt", "ipynb"), "Readme.Txt");
    }
}
