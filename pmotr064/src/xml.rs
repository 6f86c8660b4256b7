//! Extraction ciblée de valeurs dans du XML TR-064
//!
//! Ce n'est pas un parser : on cherche la première balise ouvrante portant
//! le nom demandé et on renvoie le texte brut jusqu'à la balise fermante
//! correspondante. Limites assumées :
//!
//! - la première occurrence gagne, les balises imbriquées de même nom ne sont
//!   pas distinguées ;
//! - aucune validation de la structure environnante, aucun décodage des entités ;
//! - un `>` dans une valeur d'attribut de la balise ouvrante n'est pas géré.
//!
//! Une balise absente ou non terminée donne `None`, jamais une erreur.

use std::borrow::Cow;

/// Position d'un élément trouvé dans le document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    /// Début du contenu
    start: usize,
    /// Fin du contenu (exclue)
    end: usize,
    /// Premier octet après la balise fermante
    next: usize,
}

/// Renvoie le texte entre `<tag ...>` et `</tag>`, ou `None`.
///
/// Avec `case_sensitive == false`, la casse ASCII du nom de balise est ignorée.
/// Une balise auto-fermante (`<tag/>`) donne `Some("")`.
pub fn extract<'a>(document: &'a str, tag: &str, case_sensitive: bool) -> Option<&'a str> {
    locate(document, tag, case_sensitive, 0).map(|span| &document[span.start..span.end])
}

/// Variante sensible à la casse
pub fn extract_sensitive<'a>(document: &'a str, tag: &str) -> Option<&'a str> {
    extract(document, tag, true)
}

/// Variante insensible à la casse
pub fn extract_insensitive<'a>(document: &'a str, tag: &str) -> Option<&'a str> {
    extract(document, tag, false)
}

/// Recherche sensible à la casse, puis insensible en repli
pub fn take_param<'a>(document: &'a str, tag: &str) -> Option<&'a str> {
    extract_sensitive(document, tag).or_else(|| extract_insensitive(document, tag))
}

/// Contenu de chaque occurrence successive de `tag` (sans chevauchement)
///
/// Le document n'est replié en minuscules qu'une fois pour tout le parcours.
pub fn extract_all<'a>(document: &'a str, tag: &str, case_sensitive: bool) -> Vec<&'a str> {
    let (haystack, needle) = fold(document, tag, case_sensitive);
    let mut blocks = Vec::new();
    let mut from = 0;

    while let Some(span) = locate_in(&haystack, &needle, from) {
        blocks.push(&document[span.start..span.end]);
        from = span.next;
    }

    blocks
}

fn locate(document: &str, tag: &str, case_sensitive: bool, from: usize) -> Option<Span> {
    let (haystack, needle) = fold(document, tag, case_sensitive);
    locate_in(&haystack, &needle, from)
}

// to_ascii_lowercase conserve la longueur en octets : les indices
// trouvés dans la copie repliée valent pour le document d'origine.
fn fold<'a>(document: &'a str, tag: &'a str, case_sensitive: bool) -> (Cow<'a, str>, Cow<'a, str>) {
    if case_sensitive {
        (Cow::Borrowed(document), Cow::Borrowed(tag))
    } else {
        (
            Cow::Owned(document.to_ascii_lowercase()),
            Cow::Owned(tag.to_ascii_lowercase()),
        )
    }
}

fn locate_in(haystack: &str, needle: &str, from: usize) -> Option<Span> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }

    let opening = format!("<{needle}");
    let closing = format!("</{needle}>");
    let mut cursor = from;

    while let Some(pos) = haystack[cursor..].find(&opening) {
        let after_name = cursor + pos + opening.len();
        let rest = &haystack[after_name..];

        match rest.bytes().next() {
            Some(b'>') => {
                let start = after_name + 1;
                let end = start + haystack[start..].find(&closing)?;
                return Some(Span {
                    start,
                    end,
                    next: end + closing.len(),
                });
            }
            Some(b'/') if rest[1..].starts_with('>') => {
                let next = after_name + 2;
                return Some(Span {
                    start: next,
                    end: next,
                    next,
                });
            }
            Some(c) if c.is_ascii_whitespace() => {
                let gt = rest.find('>')?;
                if rest[..gt].ends_with('/') {
                    let next = after_name + gt + 1;
                    return Some(Span {
                        start: next,
                        end: next,
                        next,
                    });
                }
                let start = after_name + gt + 1;
                let end = start + haystack[start..].find(&closing)?;
                return Some(Span {
                    start,
                    end,
                    next: end + closing.len(),
                });
            }
            // Préfixe d'un autre nom (<service> vs <serviceList>), on continue
            _ => cursor = after_name,
        }
    }

    None
}
