// Copyright 2016 Mozilla Foundation
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use cache::CacheKey;
use errors::*;

const OBJ_FILE_NAME: &'static str = "obj";
const PDB_FILE_NAME: &'static str = "pdb";

/// The on-disk cache: a directory tree under `<cache_root>/.lelcache`
/// mapping cache keys to entry directories holding `obj` and optionally
/// `pdb`.
///
/// Concurrent launchers share this tree without coordination. Deposits go
/// through a uniquely named temp file in the entry directory followed by
/// a rename, so a probe never observes a half-written artifact; two
/// deposits to the same key race benignly, last writer wins.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new<P: AsRef<Path>>(root: P) -> DiskCache {
        DiskCache { root: root.as_ref().to_owned() }
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// A key is present iff its entry directory holds a readable `obj`.
    /// An entry directory without one (e.g. left by an interrupted
    /// deposit) counts as a miss.
    pub fn probe(&self, key: &CacheKey) -> bool {
        File::open(self.entry_path(key).join(OBJ_FILE_NAME)).is_ok()
    }

    /// Copy the cached artifacts out to the user-requested paths.
    ///
    /// Failing to deliver the object file is fatal; a missing or
    /// unreadable cached pdb is an operator-caused inconsistency, warned
    /// about and otherwise ignored.
    pub fn get(&self, key: &CacheKey, object_out: &Path, pdb_out: Option<&Path>) -> Result<()> {
        let entry = self.entry_path(key);
        let cached_obj = entry.join(OBJ_FILE_NAME);
        fs::copy(&cached_obj, object_out).chain_err(|| {
            format!("unable to copy cached object file to '{}'", object_out.display())
        })?;
        if let Some(pdb_out) = pdb_out {
            let cached_pdb = entry.join(PDB_FILE_NAME);
            if cached_pdb.exists() {
                if let Err(e) = fs::copy(&cached_pdb, pdb_out) {
                    eprintln!("lelcache: unable to copy cached pdb file to '{}': {}",
                              pdb_out.display(), e);
                }
            } else {
                eprintln!("lelcache: cached pdb file not found for '{}'", pdb_out.display());
            }
        }
        Ok(())
    }

    /// Deposit the just-produced artifacts under `key`, returning the
    /// number of bytes added to the cache.
    pub fn put(&self, key: &CacheKey, object: &Path, pdb: Option<&Path>) -> Result<u64> {
        let entry = self.entry_path(key);
        fs::create_dir_all(&entry)
            .chain_err(|| format!("unable to create cache entry '{}'", entry.display()))?;
        let mut deposited = copy_atomic(object, &entry.join(OBJ_FILE_NAME))?;
        if let Some(pdb) = pdb {
            deposited += copy_atomic(pdb, &entry.join(PDB_FILE_NAME))?;
        }
        debug!("deposited {} bytes at {}", deposited, entry.display());
        Ok(deposited)
    }
}

/// Copy `src` to `dst` via a uniquely named sibling, so `dst` flips from
/// absent to complete in one rename.
fn copy_atomic(src: &Path, dst: &Path) -> Result<u64> {
    let tmp = dst.with_extension(format!("tmp{}", Uuid::new_v4().simple()));
    let bytes = fs::copy(src, &tmp).chain_err(|| {
        format!("unable to copy '{}' into the cache", src.display())
    })?;
    if let Err(e) = fs::rename(&tmp, dst) {
        let _ = fs::remove_file(&tmp);
        return Err(e).chain_err(|| format!("unable to finalize cache file '{}'", dst.display()));
    }
    Ok(bytes)
}

#[cfg(test)]
mod test {
    use std::fs::{self, File};
    use std::io::Write;
    use tempdir::TempDir;

    use super::*;

    fn write_file(path: &::std::path::Path, contents: &[u8]) {
        File::create(path).unwrap().write_all(contents).unwrap();
    }

    #[test]
    fn test_probe_missing_is_miss() {
        let td = TempDir::new("lelcache").unwrap();
        let cache = DiskCache::new(td.path().join(".lelcache"));
        assert!(!cache.probe(&CacheKey::new(1, 2)));
    }

    #[test]
    fn test_probe_demands_obj_file() {
        let td = TempDir::new("lelcache").unwrap();
        let cache = DiskCache::new(td.path().join(".lelcache"));
        let key = CacheKey::new(1, 2);
        // An entry directory without an obj, as an interrupted deposit
        // would leave behind.
        fs::create_dir_all(cache.entry_path(&key)).unwrap();
        assert!(!cache.probe(&key));
    }

    #[test]
    fn test_put_get_round_trip() {
        let td = TempDir::new("lelcache").unwrap();
        let cache = DiskCache::new(td.path().join(".lelcache"));
        let key = CacheKey::new(0xDEADBEEFCAFEBABE, 0x0123456789ABCDEF);

        let obj = td.path().join("foo.obj");
        write_file(&obj, b"object bytes");
        let deposited = cache.put(&key, &obj, None).unwrap();
        assert_eq!(b"object bytes".len() as u64, deposited);
        assert!(cache.probe(&key));

        let out = td.path().join("copied.obj");
        cache.get(&key, &out, None).unwrap();
        assert_eq!(b"object bytes".to_vec(), fs::read(&out).unwrap());
    }

    #[test]
    fn test_put_get_with_pdb() {
        let td = TempDir::new("lelcache").unwrap();
        let cache = DiskCache::new(td.path().join(".lelcache"));
        let key = CacheKey::new(3, 4);

        let obj = td.path().join("foo.obj");
        let pdb = td.path().join("foo.pdb");
        write_file(&obj, b"obj");
        write_file(&pdb, b"pdb data");
        let deposited = cache.put(&key, &obj, Some(&pdb)).unwrap();
        assert_eq!((b"obj".len() + b"pdb data".len()) as u64, deposited);

        let obj_out = td.path().join("out.obj");
        let pdb_out = td.path().join("out.pdb");
        cache.get(&key, &obj_out, Some(&pdb_out)).unwrap();
        assert_eq!(b"obj".to_vec(), fs::read(&obj_out).unwrap());
        assert_eq!(b"pdb data".to_vec(), fs::read(&pdb_out).unwrap());
    }

    #[test]
    fn test_get_missing_pdb_still_succeeds() {
        let td = TempDir::new("lelcache").unwrap();
        let cache = DiskCache::new(td.path().join(".lelcache"));
        let key = CacheKey::new(5, 6);

        let obj = td.path().join("foo.obj");
        write_file(&obj, b"obj");
        cache.put(&key, &obj, None).unwrap();

        let obj_out = td.path().join("out.obj");
        let pdb_out = td.path().join("out.pdb");
        cache.get(&key, &obj_out, Some(&pdb_out)).unwrap();
        assert!(obj_out.exists());
        assert!(!pdb_out.exists());
    }

    #[test]
    fn test_get_missing_obj_is_fatal() {
        let td = TempDir::new("lelcache").unwrap();
        let cache = DiskCache::new(td.path().join(".lelcache"));
        let out = td.path().join("out.obj");
        assert!(cache.get(&CacheKey::new(7, 8), &out, None).is_err());
    }

    #[test]
    fn test_put_leaves_no_temp_files() {
        let td = TempDir::new("lelcache").unwrap();
        let cache = DiskCache::new(td.path().join(".lelcache"));
        let key = CacheKey::new(9, 10);
        let obj = td.path().join("foo.obj");
        write_file(&obj, b"obj");
        cache.put(&key, &obj, None).unwrap();
        let names: Vec<_> = fs::read_dir(cache.entry_path(&key)).unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(vec!["obj".to_owned()], names);
    }
}
