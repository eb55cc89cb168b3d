//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::Var;
use candle_nn::VarMap;
use log::trace;
use std::{collections::HashMap, sync::MutexGuard};

/// Locks the variables of a [`VarMap`].
pub fn lock_vars(varmap: &VarMap) -> Result<MutexGuard<'_, HashMap<String, Var>>> {
    varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("Variables of a VarMap are poisoned"))
}

/// Copies variables of `src` into `dest`.
///
/// Variables are identified by their names and every variable of `dest` must
/// exist in `src`. After the call, both hold exactly the same values.
pub fn copy_params(dest: &VarMap, src: &VarMap) -> Result<()> {
    trace!("Copy parameters");
    let dest = lock_vars(dest)?;
    let src = lock_vars(src)?;

    for (name, v_dest) in dest.iter() {
        let v_src = src
            .get(name)
            .ok_or_else(|| anyhow!("Variable {} is not in the source", name))?;
        v_dest.set(v_src.as_tensor())?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device, Tensor};
    use candle_nn::Init;

    fn varmap(values: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        vm.get((3,), "var1", init, DType::F32, &Device::Cpu)?;
        let t = Tensor::from_slice(values, (3,), &Device::Cpu)?;
        lock_vars(&vm)?
            .get("var1")
            .ok_or_else(|| anyhow!("missing"))?
            .set(&t)?;
        Ok(vm)
    }

    #[test]
    fn test_copy_params() -> Result<()> {
        let vm_src = varmap(&[1.0, 2.0, 3.0])?;
        let vm_dest = varmap(&[4.0, 5.0, 6.0])?;
        copy_params(&vm_dest, &vm_src)?;

        let t: Vec<f32> = lock_vars(&vm_dest)?["var1"].as_tensor().to_vec1()?;
        assert_eq!(t, vec![1.0, 2.0, 3.0]);

        // The copy does not alias the source
        lock_vars(&vm_src)?["var1"].set(&Tensor::zeros(3, DType::F32, &Device::Cpu)?)?;
        let t: Vec<f32> = lock_vars(&vm_dest)?["var1"].as_tensor().to_vec1()?;
        assert_eq!(t, vec![1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_copy_params_missing_variable() -> Result<()> {
        let vm_src = VarMap::new();
        let vm_dest = varmap(&[4.0, 5.0, 6.0])?;
        assert!(copy_params(&vm_dest, &vm_src).is_err());
        Ok(())
    }
}
