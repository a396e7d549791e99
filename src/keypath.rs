use std::fmt::{Formatter,Display};
use std::fmt;

/**
 * Component of a path in the document heirarchy. Either an array index
 * or a mapping key.
 */
#[derive(PartialEq,Clone,Debug)]
pub enum ItemKey {
    Index(usize),
    Key(String)
}

impl From<&str> for ItemKey {
    fn from(name: &str) -> ItemKey {
        ItemKey::Key(name.to_string())
    }
}

impl From<usize> for ItemKey {
    fn from(index: usize) -> ItemKey {
        ItemKey::Index(index)
    }
}

/**
 * A path in the document heirarchy as a vector of path components.
 * Displayed as `a.b[0].c`, with keys containing a dot written as `[c.d]`.
 */
#[derive(PartialEq,Clone,Debug,Default)]
pub struct KeyPath(pub Vec<ItemKey>);

impl KeyPath {
    pub fn new() -> KeyPath {
        KeyPath(Vec::<ItemKey>::new())
    }
    pub fn push(&self,key: ItemKey) -> KeyPath {
        let mut newvec = self.0.clone();
        newvec.push(key);
        KeyPath(newvec)
    }
}

impl From<&[ItemKey]> for KeyPath {
    fn from(items: &[ItemKey]) -> KeyPath {
        KeyPath(Vec::<ItemKey>::from(items))
    }
}

/** Bracketed when the text would otherwise read as more than one component */
impl Display for ItemKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ItemKey::Index(u) => write!(f,"[{}]",u),
            ItemKey::Key(key) if key.contains('.') => write!(f,"[{}]",key),
            ItemKey::Key(key) => f.write_str(key)
        }
    }
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (i,item) in self.0.iter().enumerate() {
            if i > 0 && matches!(item,ItemKey::Key(_)) {
                f.write_str(".")?;
            }
            write!(f,"{}",item)?;
        }
        Ok(())
    }
}
