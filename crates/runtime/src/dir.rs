// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in directory and null drivers
//!
//! `sys.dir` backs the root file and any directory created through
//! `Dir::Newdir`: an in-memory, insertion-ordered map of named children.
//! The directory graph holds the core's strong reference to each child.
//! `sys.null` is the inert driver behind `Dir::New` children until a real
//! driver takes over via `Dir::Add`.

use crate::driver::Driver;
use crate::error::InitError;
use crate::file::{FileHandle, FileSpec};
use crate::req::{DirEntry, DirReq, Reply, Req, ReqCat, ReqPayload};
use async_trait::async_trait;
use fil_core::{path, FileEvent, ReqError, ReqResult};
use indexmap::IndexMap;
use std::any::Any;
use std::sync::Arc;

pub const DIR_DRIVER_NAME: &str = "sys.dir";
pub const NULL_DRIVER_NAME: &str = "sys.null";

#[derive(Default)]
struct DirCtx {
    entries: IndexMap<String, FileHandle>,
}

/// In-memory directory driver.
pub struct DirDriver;

impl DirDriver {
    pub(crate) fn fresh_ctx() -> Box<dyn Any + Send> {
        Box::new(DirCtx::default())
    }
}

fn child_path(dir: &FileHandle, name: &str) -> String {
    let base = path::drop_trailing_slash(dir.path());
    format!("{base}/{name}")
}

fn list(dir: &FileHandle) -> ReqResult<Reply> {
    let entries = dir
        .with_ctx::<DirCtx, _>(|ctx| {
            ctx.entries
                .iter()
                .map(|(name, file)| DirEntry {
                    name: name.clone(),
                    file: file.clone(),
                })
                .collect::<Vec<_>>()
        })
        .ok_or(ReqError::Aborted)?;
    Ok(Reply::Entries(entries))
}

fn find(dir: &FileHandle, name: &str) -> ReqResult<Reply> {
    let hit = dir
        .with_ctx::<DirCtx, _>(|ctx| ctx.entries.get(name).cloned())
        .ok_or(ReqError::Aborted)?;
    Ok(Reply::Entry(hit.map(|file| DirEntry {
        name: name.to_owned(),
        file,
    })))
}

fn add(dir: &FileHandle, name: String, file: FileHandle) -> ReqResult<Reply> {
    if !path::validate_name(&name) {
        return Err(ReqError::Invalid);
    }
    let inserted = dir
        .with_ctx::<DirCtx, _>(|ctx| {
            if ctx.entries.contains_key(&name) {
                false
            } else {
                ctx.entries.insert(name.clone(), file.clone());
                true
            }
        })
        .ok_or(ReqError::Aborted)?;
    if !inserted {
        return Err(ReqError::Invalid);
    }
    dir.trigger(FileEvent::Update);
    Ok(Reply::None)
}

fn create(dir: &FileHandle, name: String, driver_name: &str) -> ReqResult<Reply> {
    if !path::validate_name(&name) {
        return Err(ReqError::Invalid);
    }
    let exists = dir
        .with_ctx::<DirCtx, _>(|ctx| ctx.entries.contains_key(&name))
        .ok_or(ReqError::Aborted)?;
    if exists {
        return Err(ReqError::Invalid);
    }

    let iso = dir.isolate().ok_or(ReqError::Aborted)?;
    let driver = iso.driver_lookup(driver_name).ok_or(ReqError::Aborted)?;
    let child = iso
        .file_new(FileSpec::new(driver).with_path(child_path(dir, &name)))
        .map_err(|_| ReqError::Aborted)?;

    let inserted = dir
        .with_ctx::<DirCtx, _>(|ctx| {
            if ctx.entries.contains_key(&name) {
                false
            } else {
                ctx.entries.insert(name.clone(), child.clone());
                true
            }
        })
        .ok_or(ReqError::Aborted)?;
    if !inserted {
        return Err(ReqError::Invalid);
    }
    dir.trigger(FileEvent::Update);
    Ok(Reply::Entry(Some(DirEntry { name, file: child })))
}

fn rm(dir: &FileHandle, name: &str) -> ReqResult<Reply> {
    let removed = dir
        .with_ctx::<DirCtx, _>(|ctx| ctx.entries.shift_remove(name))
        .ok_or(ReqError::Aborted)?;
    match removed {
        Some(_) => {
            dir.trigger(FileEvent::Update);
            Ok(Reply::None)
        }
        None => Err(ReqError::Invalid),
    }
}

#[async_trait]
impl Driver for DirDriver {
    fn name(&self) -> &str {
        DIR_DRIVER_NAME
    }

    fn categories(&self) -> &[ReqCat] {
        &[ReqCat::Dir]
    }

    fn init(&self, file: &FileHandle) -> Result<(), InitError> {
        file.set_ctx(Self::fresh_ctx());
        Ok(())
    }

    async fn handle(&self, req: Req) -> ReqResult<Reply> {
        let dir = &req.file;
        match req.payload {
            ReqPayload::Dir(DirReq::List) => list(dir),
            ReqPayload::Dir(DirReq::Find { name }) => find(dir, &name),
            ReqPayload::Dir(DirReq::Add { name, file }) => add(dir, name, file),
            ReqPayload::Dir(DirReq::New { name }) => create(dir, name, NULL_DRIVER_NAME),
            ReqPayload::Dir(DirReq::Newdir { name }) => create(dir, name, DIR_DRIVER_NAME),
            ReqPayload::Dir(DirReq::Rm { name }) => rm(dir, &name),
            _ => Err(ReqError::Invalid),
        }
    }
}

/// Driver of inert placeholder files. Serves no category.
pub struct NullDriver;

#[async_trait]
impl Driver for NullDriver {
    fn name(&self) -> &str {
        NULL_DRIVER_NAME
    }

    fn categories(&self) -> &[ReqCat] {
        &[]
    }

    fn init(&self, _file: &FileHandle) -> Result<(), InitError> {
        Ok(())
    }

    async fn handle(&self, _req: Req) -> ReqResult<Reply> {
        Err(ReqError::Invalid)
    }
}

pub(crate) fn builtin_drivers() -> Vec<Arc<dyn Driver>> {
    vec![Arc::new(DirDriver), Arc::new(NullDriver)]
}

#[cfg(test)]
#[path = "dir_tests.rs"]
mod tests;
