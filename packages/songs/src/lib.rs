include!(concat!(env!("OUT_DIR"), "/songs.rs"));

/// A song document with its library name
#[derive(Debug, Clone)]
pub struct SongFile {
    pub name: String,
    pub content: String,
}

impl SongFile {
    fn from_entry(&(name, content): &(&str, &str)) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
        }
    }
}

/// Get all embedded songs
pub fn get_all_songs() -> Vec<SongFile> {
    SONGS.iter().map(SongFile::from_entry).collect()
}

/// Get a song by name, e.g. `"ode-to-joy"`
pub fn get_song(name: &str) -> Option<SongFile> {
    SONGS
        .iter()
        .find(|(n, _)| *n == name)
        .map(SongFile::from_entry)
}

/// List all song names
pub fn list_songs() -> Vec<&'static str> {
    SONGS.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_is_not_empty() {
        assert!(!list_songs().is_empty());
        assert_eq!(get_all_songs().len(), list_songs().len());
    }

    #[test]
    fn test_get_song_by_name() {
        let song = get_song("ode-to-joy").unwrap();
        assert_eq!(song.name, "ode-to-joy");
        assert!(song.content.starts_with("---"));
        assert!(get_song("ode-to-joy.song").is_none());
    }
}
