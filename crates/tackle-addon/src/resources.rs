// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed access to hub resources.
//!
//! Identity and proxy reads are decrypted locally with the passphrase from the
//! injected secret; the passphrase itself never goes over the wire. Writes send
//! plaintext and the hub encrypts before storing.

use std::marker::PhantomData;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tackle_api::{
    Application, Artifact, Bucket, Encryptable, Identity, Proxy, Repository, Setting, Tag,
    TagType,
};

use crate::adapter::Addon;
use crate::error::{AddonError, Result};

/// Handle on one hub collection.
pub struct Resource<'a, T> {
    addon: &'a Addon,
    collection: &'static str,
    _kind: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Resource<'a, T> {
    fn new(addon: &'a Addon, collection: &'static str) -> Self {
        Self {
            addon,
            collection,
            _kind: PhantomData,
        }
    }

    /// Fetch one resource by ID.
    pub async fn get(&self, id: i64) -> Result<T> {
        self.addon
            .client()
            .get(&format!("/{}/{}", self.collection, id))
            .await
    }

    /// Fetch the whole collection.
    pub async fn list(&self) -> Result<Vec<T>> {
        self.addon
            .client()
            .get(&format!("/{}", self.collection))
            .await
    }

    /// Delete one resource by ID.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.addon
            .client()
            .delete(&format!("/{}/{}", self.collection, id))
            .await
    }
}

impl<T: Serialize + DeserializeOwned> Resource<'_, T> {
    /// Create a resource and return it as stored, ID assigned.
    pub async fn create(&self, resource: &T) -> Result<T> {
        self.addon
            .client()
            .create(&format!("/{}", self.collection), resource)
            .await
    }

    /// Replace the resource with ID `id`.
    pub async fn update(&self, id: i64, resource: &T) -> Result<()> {
        self.addon
            .client()
            .put(&format!("/{}/{}", self.collection, id), resource)
            .await
    }
}

/// Credential collection whose reads are decrypted before returning.
pub struct Credentials<'a, T> {
    inner: Resource<'a, T>,
}

impl<T: DeserializeOwned + Encryptable> Credentials<'_, T> {
    /// Fetch and decrypt one record.
    pub async fn get(&self, id: i64) -> Result<T> {
        let mut record = self.inner.get(id).await?;
        self.decrypt(&mut record)?;
        Ok(record)
    }

    /// Fetch and decrypt every record.
    pub async fn list(&self) -> Result<Vec<T>> {
        let mut records = self.inner.list().await?;
        for record in &mut records {
            self.decrypt(record)?;
        }
        Ok(records)
    }

    /// Delete one record.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.inner.delete(id).await
    }

    fn decrypt(&self, record: &mut T) -> Result<()> {
        if record.encrypted().is_empty() {
            return Ok(());
        }
        let codec = self.inner.addon.codec().ok_or(AddonError::NoPassphrase)?;
        codec.decrypt(record)?;
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned + Encryptable> Credentials<'_, T> {
    /// Create a record from plaintext fields and return it decrypted.
    pub async fn create(&self, record: &T) -> Result<T> {
        let mut created = self.inner.create(record).await?;
        self.decrypt(&mut created)?;
        Ok(created)
    }

    /// Replace a record with plaintext fields.
    pub async fn update(&self, id: i64, record: &T) -> Result<()> {
        self.inner.update(id, record).await
    }
}

/// Bucket collection plus local path resolution on the shared volume.
pub struct Buckets<'a> {
    inner: Resource<'a, Bucket>,
}

impl Buckets<'_> {
    /// Fetch one bucket by ID.
    pub async fn get(&self, id: i64) -> Result<Bucket> {
        self.inner.get(id).await
    }

    /// Fetch every bucket.
    pub async fn list(&self) -> Result<Vec<Bucket>> {
        self.inner.list().await
    }

    /// Create a bucket; the hub assigns its path.
    pub async fn create(&self, bucket: &Bucket) -> Result<Bucket> {
        self.inner.create(bucket).await
    }

    /// Delete a bucket.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.inner.delete(id).await
    }

    /// Where `bucket` lives inside this pod.
    pub fn local_path(&self, bucket: &Bucket) -> PathBuf {
        self.inner
            .addon
            .bucket_path()
            .join(bucket.path.trim_start_matches('/'))
    }
}

/// Hub settings, addressed by key.
pub struct Settings<'a> {
    addon: &'a Addon,
}

impl Settings<'_> {
    /// Fetch one setting.
    pub async fn get(&self, key: &str) -> Result<Setting> {
        self.addon.client().get(&format!("/settings/{}", key)).await
    }

    /// Fetch every setting.
    pub async fn list(&self) -> Result<Vec<Setting>> {
        self.addon.client().get("/settings").await
    }

    /// Create a setting.
    pub async fn create(&self, key: &str, value: Value) -> Result<()> {
        let setting = Setting {
            key: key.to_string(),
            value,
        };
        self.addon.client().post("/settings", &setting).await
    }

    /// Replace the value of an existing setting.
    pub async fn update(&self, key: &str, value: &Value) -> Result<()> {
        self.addon
            .client()
            .put(&format!("/settings/{}", key), value)
            .await
    }

    /// Delete a setting.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.addon
            .client()
            .delete(&format!("/settings/{}", key))
            .await
    }
}

impl Addon {
    /// Application inventory.
    pub fn applications(&self) -> Resource<'_, Application> {
        Resource::new(self, "applications")
    }

    /// Files produced by addons.
    pub fn artifacts(&self) -> Resource<'_, Artifact> {
        Resource::new(self, "artifacts")
    }

    /// Buckets on the shared volume.
    pub fn buckets(&self) -> Buckets<'_> {
        Buckets {
            inner: Resource::new(self, "buckets"),
        }
    }

    /// Source and maven credentials, decrypted on read.
    pub fn identities(&self) -> Credentials<'_, Identity> {
        Credentials {
            inner: Resource::new(self, "identities"),
        }
    }

    /// Proxy definitions, decrypted on read.
    pub fn proxies(&self) -> Credentials<'_, Proxy> {
        Credentials {
            inner: Resource::new(self, "proxies"),
        }
    }

    /// Tags.
    pub fn tags(&self) -> Resource<'_, Tag> {
        Resource::new(self, "tags")
    }

    /// Tag categories.
    pub fn tag_types(&self) -> Resource<'_, TagType> {
        Resource::new(self, "tagtypes")
    }

    /// Source repositories.
    pub fn repositories(&self) -> Resource<'_, Repository> {
        Resource::new(self, "repositories")
    }

    /// Hub settings by key.
    pub fn settings(&self) -> Settings<'_> {
        Settings { addon: self }
    }
}
