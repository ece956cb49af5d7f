//! Macro for building a component mask from component types.

use proc_macro2::{Ident, TokenStream};
use quote::{ToTokens, format_ident, quote, quote_spanned};
use syn::{
    Error, Result, Token, Type,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
};

pub(crate) struct MaskOfInput {
    component_types: Punctuated<Type, Token![,]>,
}

pub(crate) fn mask_of(input: MaskOfInput, crate_root: &Ident) -> Result<TokenStream> {
    let component_types: Vec<_> = input.component_types.into_iter().collect();

    verify_comp_types_unique(&component_types)?;

    let assertions = component_types
        .iter()
        .enumerate()
        .map(|(idx, ty)| create_assertion_that_type_impls_component_trait(idx, ty, crate_root));

    Ok(quote! {
        // Local scope keeps the assertion types out of the caller's namespace
        {
            #(#assertions)*
            #crate_root::mask::ComponentMask::from_component_ids(
                [#(<#component_types as #crate_root::component::Component>::COMPONENT_ID),*]
            )
        }
    })
}

fn verify_comp_types_unique(comp_types: &[Type]) -> Result<()> {
    for (idx, ty) in comp_types.iter().enumerate() {
        if comp_types[..idx].contains(ty) {
            return Err(Error::new_spanned(
                ty,
                format!(
                    "component type `{}` occurs more than once",
                    ty.to_token_stream()
                ),
            ));
        }
    }
    Ok(())
}

fn create_assertion_that_type_impls_component_trait(
    idx: usize,
    ty: &Type,
    crate_root: &Ident,
) -> TokenStream {
    let dummy_struct_name = format_ident!("__AssertComponent{}", idx);
    quote_spanned! {ty.span()=>
        // Fails to compile if `ty` does not implement `Component`
        #[allow(dead_code)]
        struct #dummy_struct_name where #ty: #crate_root::component::Component;
    }
}

impl Parse for MaskOfInput {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        Ok(Self {
            component_types: Punctuated::parse_terminated(input)?,
        })
    }
}
